use std::collections::BTreeSet;

/// `fx:id` without its trailing digits (`button12` -> `button`)
pub fn id_base(id: &str) -> &str {
    let base = id.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.is_empty() {
        id
    } else {
        base
    }
}

/// Sequential `fx:id` generator avoiding a set of taken identifiers
#[derive(Debug, Clone, Default)]
pub struct FxIdGenerator {
    taken: BTreeSet<String>,
}

impl FxIdGenerator {
    pub fn new(taken: impl IntoIterator<Item = String>) -> Self {
        Self {
            taken: taken.into_iter().collect(),
        }
    }

    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    pub fn reserve(&mut self, id: impl Into<String>) {
        self.taken.insert(id.into());
    }

    /// Next free identifier derived from `id`, reserved before returning
    pub fn new_id(&mut self, id: &str) -> String {
        let base = id_base(id);
        let mut count = 1u32;
        loop {
            let candidate = format!("{}{}", base, count);
            if !self.taken.contains(&candidate) {
                self.taken.insert(candidate.clone());
                return candidate;
            }
            count += 1;
        }
    }
}
