use serde::{Deserialize, Serialize};

/// Resumable position inside a table's content.
///
/// A cursor is a plain value: the step function takes one and returns the
/// next, so every fill starts from [`Cursor::default`] and two fills of the
/// same table never share state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Next table-level descriptor to place.
    pub descriptor: usize,
    /// Child entry being placed.
    pub entry: usize,
    /// Next descriptor of the current child entry.
    pub entry_descriptor: usize,
}

impl Cursor {
    /// Move to the start of the next child entry.
    pub(crate) fn next_entry(&mut self) {
        self.entry += 1;
        self.entry_descriptor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_entry_resets_inner_position() {
        let mut cursor = Cursor {
            descriptor: 3,
            entry: 1,
            entry_descriptor: 4,
        };
        cursor.next_entry();
        assert_eq!(
            cursor,
            Cursor {
                descriptor: 3,
                entry: 2,
                entry_descriptor: 0
            }
        );
    }

    #[test]
    fn test_cursor_survives_serde() {
        let cursor = Cursor {
            descriptor: 2,
            entry: 7,
            entry_descriptor: 1,
        };
        let text = toml::to_string(&cursor).unwrap();
        assert_eq!(text, "descriptor = 2\nentry = 7\nentry_descriptor = 1\n");
        assert_eq!(toml::from_str::<Cursor>(&text).unwrap(), cursor);
    }
}
