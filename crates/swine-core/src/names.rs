/// Allocates fresh solver symbols, one counter per engine instance.
#[derive(Debug, Clone)]
pub struct NameAllocator {
    prefix: String,
    next: u64,
}

impl NameAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        name
    }

    /// True if `name` could have been produced by this allocator.
    pub fn owns(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new("swine!a")
    }
}
