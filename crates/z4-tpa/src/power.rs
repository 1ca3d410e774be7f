//! Per-level storage of power abstractions

/// Values indexed by power level, with explicit absence
#[derive(Debug, Clone)]
pub struct PowerArray<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for PowerArray<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> PowerArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, level: u32) -> Option<&T> {
        self.slots.get(level as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, level: u32) -> Option<&mut T> {
        self.slots.get_mut(level as usize).and_then(Option::as_mut)
    }

    pub fn contains(&self, level: u32) -> bool {
        self.get(level).is_some()
    }

    /// Store a value, growing the array as needed
    pub fn set(&mut self, level: u32, value: T) {
        let index = level as usize;
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    /// One past the highest level ever stored
    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Present levels in ascending order
    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_levels_stay_absent() {
        let mut powers = PowerArray::new();
        powers.set(3, "c");
        powers.set(1, "a");
        assert_eq!(powers.get(1), Some(&"a"));
        assert_eq!(powers.get(2), None);
        assert_eq!(powers.get(7), None);
        assert_eq!(powers.len(), 4);
        assert_eq!(powers.levels().collect::<Vec<_>>(), vec![1, 3]);
    }
}
