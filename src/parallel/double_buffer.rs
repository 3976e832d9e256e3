//! Two iterate slots with swappable source/destination roles.
//!
//! Swapping flips a flag; buffer contents never move. At any time exactly one slot is the
//! read-only source and the other the write-only destination.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoubleBuffer<B> {
    first: B,
    second: B,
    source: Slot,
}

impl<B> DoubleBuffer<B> {
    /// `first` starts as the destination, `second` as the source; the driver swaps before each
    /// sweep, so the first sweep writes into `second`.
    pub fn new(first: B, second: B) -> Self {
        Self { first, second, source: Slot::Second }
    }

    pub fn swap(&mut self) {
        self.source = self.source.other();
    }

    pub fn source_slot(&self) -> Slot {
        self.source
    }

    pub fn destination_slot(&self) -> Slot {
        self.source.other()
    }

    pub fn get(&self, slot: Slot) -> &B {
        match slot {
            Slot::First => &self.first,
            Slot::Second => &self.second,
        }
    }

    pub fn source(&self) -> &B {
        self.get(self.source)
    }

    pub fn destination(&self) -> &B {
        self.get(self.destination_slot())
    }

    /// `(source, destination)` borrowed for one sweep.
    pub fn split(&mut self) -> (&B, &mut B) {
        match self.source {
            Slot::First => (&self.first, &mut self.second),
            Slot::Second => (&self.second, &mut self.first),
        }
    }

    /// `(first, second)`, regardless of roles.
    pub fn into_parts(self) -> (B, B) {
        (self.first, self.second)
    }

    /// Both slots mutable, `(source, destination)`, for in-place update rules.
    pub fn split_mut(&mut self) -> (&mut B, &mut B) {
        match self.source {
            Slot::First => (&mut self.first, &mut self.second),
            Slot::Second => (&mut self.second, &mut self.first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_flips_roles_without_moving_data() {
        let mut db = DoubleBuffer::new(vec![1], vec![2]);
        assert_eq!(db.source(), &vec![2]);
        db.swap();
        assert_eq!(db.source_slot(), Slot::First);
        assert_eq!(db.source(), &vec![1]);
        assert_eq!(db.destination(), &vec![2]);
        let (src, dst) = db.split();
        dst[0] = src[0] + 10;
        assert_eq!(db.get(Slot::Second), &vec![11]);
    }

    #[test]
    fn double_swap_is_identity() {
        let mut db = DoubleBuffer::new('a', 'b');
        let before = db.source_slot();
        db.swap();
        db.swap();
        assert_eq!(db.source_slot(), before);
    }
}
