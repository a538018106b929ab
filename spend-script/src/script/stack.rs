// spend-script/src/script/stack.rs

use std::fmt;

use crate::constants::DEFAULT_SCRIPT_NUM_LEN;
use crate::error::ScriptError;
use crate::script::script_num::{make_script_num, script_num_bytes};

/// Interprets a stack element as a boolean. Any non-zero byte is true,
/// except that negative zero (a lone sign bit in the last byte) is false.
pub fn as_bool(v: &[u8]) -> bool {
    for (i, b) in v.iter().enumerate() {
        if *b != 0 {
            if i == v.len() - 1 && *b == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

fn from_bool(b: bool) -> Vec<u8> {
    if b {
        vec![0x01]
    } else {
        vec![]
    }
}

/// A stack of byte arrays. Index 0 in the `*_n` helpers is the top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { items: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Contents bottom to top.
    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.items
    }

    /// Replaces the contents; the last element becomes the top.
    pub fn set(&mut self, items: Vec<Vec<u8>>) {
        self.items = items;
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn push_int(&mut self, n: i64) {
        self.items.push(script_num_bytes(n));
    }

    pub fn push_bool(&mut self, b: bool) {
        self.items.push(from_bool(b));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.items.pop().ok_or(ScriptError::StackUnderflow)
    }

    pub fn pop_int(&mut self) -> Result<i64, ScriptError> {
        self.pop_int_len(DEFAULT_SCRIPT_NUM_LEN)
    }

    pub fn pop_int_len(&mut self, max_len: usize) -> Result<i64, ScriptError> {
        let bytes = self.pop_byte_array()?;
        make_script_num(&bytes, max_len)
    }

    pub fn pop_bool(&mut self) -> Result<bool, ScriptError> {
        let bytes = self.pop_byte_array()?;
        Ok(as_bool(&bytes))
    }

    fn index(&self, idx: usize) -> Result<usize, ScriptError> {
        if idx >= self.items.len() {
            return Err(ScriptError::StackUnderflow);
        }
        Ok(self.items.len() - idx - 1)
    }

    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], ScriptError> {
        let i = self.index(idx)?;
        Ok(&self.items[i])
    }

    pub fn peek_bool(&self, idx: usize) -> Result<bool, ScriptError> {
        Ok(as_bool(self.peek_byte_array(idx)?))
    }

    // Remove the item `idx` deep and return it.
    fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, ScriptError> {
        let i = self.index(idx)?;
        Ok(self.items.remove(i))
    }

    /// Removes the top `n` items.
    pub fn drop_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n > self.items.len() {
            return Err(ScriptError::StackUnderflow);
        }
        let len = self.items.len();
        self.items.truncate(len - n);
        Ok(())
    }

    /// Duplicates the top `n` items in order.
    pub fn dup_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n > self.items.len() {
            return Err(ScriptError::StackUnderflow);
        }
        let start = self.items.len() - n;
        for i in start..start + n {
            let item = self.items[i].clone();
            self.items.push(item);
        }
        Ok(())
    }

    /// Rotates the top `3n` items left by `n`: [x1 x2 x3] -> [x2 x3 x1] for n = 1.
    pub fn rot_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n == 0 {
            return Err(ScriptError::StackUnderflow);
        }
        let entry = 3 * n - 1;
        for _ in 0..n {
            let item = self.nip_n(entry)?;
            self.items.push(item);
        }
        Ok(())
    }

    /// Swaps the top `n` items with the `n` below them.
    pub fn swap_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n == 0 {
            return Err(ScriptError::StackUnderflow);
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let item = self.nip_n(entry)?;
            self.items.push(item);
        }
        Ok(())
    }

    /// Copies the `n` items below the top `n` onto the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), ScriptError> {
        if n == 0 {
            return Err(ScriptError::StackUnderflow);
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let item = self.peek_byte_array(entry)?.to_vec();
            self.items.push(item);
        }
        Ok(())
    }

    /// Copies the item `n` deep onto the top.
    pub fn pick_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let item = self.peek_byte_array(n)?.to_vec();
        self.items.push(item);
        Ok(())
    }

    /// Moves the item `n` deep onto the top.
    pub fn roll_n(&mut self, n: usize) -> Result<(), ScriptError> {
        let item = self.nip_n(n)?;
        self.items.push(item);
        Ok(())
    }

    /// Removes the item just below the top.
    pub fn nip(&mut self) -> Result<(), ScriptError> {
        self.nip_n(1).map(|_| ())
    }

    /// Copies the top item below the second: [x1 x2] -> [x2 x1 x2].
    pub fn tuck(&mut self) -> Result<(), ScriptError> {
        let top = self.peek_byte_array(0)?.to_vec();
        let i = self.index(1)?;
        self.items.insert(i, top);
        Ok(())
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate().rev() {
            writeln!(f, "{:04}: {}", self.items.len() - i - 1, hex::encode(item))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(items: &[&[u8]]) -> Stack {
        let mut s = Stack::new();
        s.set(items.iter().map(|i| i.to_vec()).collect());
        s
    }

    #[test]
    fn test_as_bool() {
        assert!(!as_bool(&[]));
        assert!(!as_bool(&[0x00, 0x00]));
        assert!(!as_bool(&[0x00, 0x80]));
        assert!(as_bool(&[0x80, 0x00]));
        assert!(as_bool(&[0x01]));
    }

    #[test]
    fn test_rot_swap_over() {
        let mut s = stack_of(&[b"1", b"2", b"3"]);
        s.rot_n(1).unwrap();
        assert_eq!(s, stack_of(&[b"2", b"3", b"1"]));

        let mut s = stack_of(&[b"1", b"2", b"3", b"4"]);
        s.swap_n(2).unwrap();
        assert_eq!(s, stack_of(&[b"3", b"4", b"1", b"2"]));

        let mut s = stack_of(&[b"1", b"2", b"3", b"4"]);
        s.over_n(2).unwrap();
        assert_eq!(s, stack_of(&[b"1", b"2", b"3", b"4", b"1", b"2"]));

        let mut s = stack_of(&[b"1", b"2", b"3", b"4", b"5", b"6"]);
        s.rot_n(2).unwrap();
        assert_eq!(s, stack_of(&[b"3", b"4", b"5", b"6", b"1", b"2"]));
    }

    #[test]
    fn test_pick_roll_tuck() {
        let mut s = stack_of(&[b"a", b"b", b"c"]);
        s.pick_n(2).unwrap();
        assert_eq!(s, stack_of(&[b"a", b"b", b"c", b"a"]));
        s.roll_n(3).unwrap();
        assert_eq!(s, stack_of(&[b"b", b"c", b"a", b"a"]));

        let mut s = stack_of(&[b"x", b"y"]);
        s.tuck().unwrap();
        assert_eq!(s, stack_of(&[b"y", b"x", b"y"]));
    }

    #[test]
    fn test_underflow() {
        let mut s = stack_of(&[b"a"]);
        assert_eq!(s.dup_n(2), Err(ScriptError::StackUnderflow));
        assert_eq!(s.pick_n(1), Err(ScriptError::StackUnderflow));
        assert_eq!(s.nip(), Err(ScriptError::StackUnderflow));
        s.drop_n(1).unwrap();
        assert_eq!(s.pop_byte_array(), Err(ScriptError::StackUnderflow));
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut s = stack_of(&[b"1", b"2", b"3"]);
        assert_eq!(s.rot_n(0), Err(ScriptError::StackUnderflow));
        assert_eq!(s.swap_n(0), Err(ScriptError::StackUnderflow));
        assert_eq!(s.over_n(0), Err(ScriptError::StackUnderflow));
        assert_eq!(s, stack_of(&[b"1", b"2", b"3"]));
    }
}
