use crate::verdict::{Verdict, is_verdict_pass};

pub const DEFAULT_SLOT_COUNT: usize = 3;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestSlot {
    pub input: String,
    pub expected: String,
    pub output: String,
    pub verdict: Verdict,
}

impl TestSlot {
    pub fn has_input(&self) -> bool {
        !self.input.trim().is_empty()
    }

    pub fn has_expected(&self) -> bool {
        !self.expected.trim().is_empty()
    }

    /// Stores captured output and judges it, unless either side is empty.
    pub fn record_output(&mut self, stdout: String) {
        self.output = stdout;
        if self.output.is_empty() || self.expected.is_empty() {
            return;
        }
        self.verdict = if is_verdict_pass(&self.output, &self.expected) {
            Verdict::Accepted
        } else {
            Verdict::WrongAnswer
        };
    }

    pub fn clear(&mut self, output_only: bool) {
        if !output_only {
            self.input.clear();
            self.expected.clear();
        }
        self.output.clear();
        self.verdict = Verdict::Unknown;
    }
}

/// Ordered test slots, 0-indexed here and 1-indexed in file names and messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestSlots {
    slots: Vec<TestSlot>,
}

impl TestSlots {
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![TestSlot::default(); count.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TestSlot> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut TestSlot> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestSlot> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TestSlot> {
        self.slots.iter_mut()
    }

    pub fn clear(&mut self, output_only: bool) {
        for slot in &mut self.slots {
            slot.clear(output_only);
        }
    }

    /// Slots worth running: the ones with a non-blank input.
    pub fn enabled(&self) -> Vec<bool> {
        self.slots.iter().map(TestSlot::has_input).collect()
    }

    pub fn inputs(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.input.as_str()).collect()
    }
}

impl Default for TestSlots {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_COUNT)
    }
}
