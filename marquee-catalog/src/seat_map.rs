use serde::Serialize;

/// Row width used when the caller has no layout of its own.
pub const DEFAULT_COLUMNS: u32 = 10;

/// Seat labels of a room, row by row.
///
/// Rows are lettered `A`, `B`, … and seats numbered from 1. Past row `Z`
/// the letters continue spreadsheet-style (`AA`, `AB`, …). Only the last
/// row may be shorter than `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SeatMap {
    columns: u32,
    rows: Vec<Vec<String>>,
}

impl SeatMap {
    /// Lay out `total_seats` seats in rows of `columns`.
    ///
    /// Returns an empty map when either argument is zero.
    pub fn generate(total_seats: u32, columns: u32) -> Self {
        if total_seats == 0 || columns == 0 {
            return Self::default();
        }

        let row_count = total_seats.div_ceil(columns);
        let mut rows = Vec::with_capacity(row_count as usize);
        let mut emitted = 0u32;

        for r in 0..row_count as usize {
            let letters = row_label(r);
            let width = columns.min(total_seats - emitted);
            rows.push((1..=width).map(|c| format!("{}{}", letters, c)).collect());
            emitted += width;
        }

        Self { columns, rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of seats.
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All labels in row-major order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.locate(label).is_some()
    }

    /// Zero-based (row, column) of a label, if it belongs to this map.
    pub fn locate(&self, label: &str) -> Option<(usize, usize)> {
        let split = label.find(|c: char| c.is_ascii_digit())?;
        let (letters, number) = label.split_at(split);
        if number.starts_with('0') {
            return None;
        }
        let row = row_index(letters)?;
        let column: usize = number.parse().ok()?;
        let seats = self.rows.get(row)?;
        (column >= 1 && column <= seats.len()).then_some((row, column - 1))
    }
}

/// Letters of the row at `index`: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn row_label(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn row_index(letters: &str) -> Option<usize> {
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        let digit = (c as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    n.checked_sub(1)
}
