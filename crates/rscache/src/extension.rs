//! File extension guessing from content

/// Guesses a file extension from the leading bytes of an entry.
pub trait ExtensionGuesser: Send + Sync {
    /// The extension without a leading dot, or `None` if unknown.
    fn guess_extension(&self, data: &[u8]) -> Option<String>;
}

/// One step in an [`ExtendableExtensionGuesser`] chain
pub type GuessAction = Box<dyn Fn(&[u8]) -> Option<String> + Send + Sync>;

/// Magic numbers recognized by default, checked in order
const MAGIC_NUMBERS: &[(&[u8], &str)] = &[
    (b"OggS", "ogg"),
    (b"JAGA", "jaga"),
    (&[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a], "png"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"BM", "bmp"),
    (b"MThd", "mid"),
    (&[0x1f, 0x8b], "gz"),
    (b"BZh", "bz2"),
    (&[0x49, 0x49, 0x2a, 0x00], "tiff"),
    (&[0x4d, 0x4d, 0x00, 0x2a], "tiff"),
    // mp3 frames and ID3 tags are stored with a wav extension
    (&[0xff, 0xfb], "wav"),
    (b"ID3", "wav"),
    (&[0xff, 0xd8, 0xff], "jpg"),
    (b"PK", "zip"),
    (b"RIFF", "wav"),
    (b"ustar", "tar"),
    (&[0x37, 0x7a, 0xbc, 0xaf, 0x27, 0x1c], "7z"),
];

/// Extension of the first magic number `data` starts with.
pub fn guess_from_magic_number(data: &[u8]) -> Option<String> {
    MAGIC_NUMBERS
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, extension)| (*extension).to_string())
}

/// A chain of guess actions; the first one to return an extension wins.
pub struct ExtendableExtensionGuesser {
    actions: Vec<GuessAction>,
}

impl std::fmt::Debug for ExtendableExtensionGuesser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendableExtensionGuesser")
            .field("actions", &self.actions.len())
            .finish()
    }
}

impl Default for ExtendableExtensionGuesser {
    fn default() -> Self {
        Self {
            actions: vec![Box::new(guess_from_magic_number) as GuessAction],
        }
    }
}

impl ExtendableExtensionGuesser {
    /// A guesser with no actions, which never guesses.
    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Append an action, consulted after the existing ones.
    pub fn add_action<F>(&mut self, action: F)
    where
        F: Fn(&[u8]) -> Option<String> + Send + Sync + 'static,
    {
        self.actions.push(Box::new(action));
    }

    /// Prepend an action, consulted before the existing ones.
    pub fn prepend_action<F>(&mut self, action: F)
    where
        F: Fn(&[u8]) -> Option<String> + Send + Sync + 'static,
    {
        self.actions.insert(0, Box::new(action));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ExtensionGuesser for ExtendableExtensionGuesser {
    fn guess_extension(&self, data: &[u8]) -> Option<String> {
        self.actions.iter().find_map(|action| action(data))
    }
}
