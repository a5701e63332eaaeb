//! Table detection in extracted page text.

use super::ExtractedTable;

/// Tables need at least this many consecutive tabular lines.
const MIN_TABLE_ROWS: usize = 2;

/// Heuristic: a line looks tabular if it has multiple columns separated by
/// tabs, pipes, or runs of 3+ spaces.
pub fn is_tabular_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 5 {
        return false;
    }

    trimmed.matches('\t').count() >= 2
        || trimmed.matches('|').count() >= 2
        || count_multi_space_gaps(trimmed) >= 2
}

/// Count runs of 3+ consecutive spaces.
fn count_multi_space_gaps(text: &str) -> usize {
    let mut count = 0;
    let mut gap_len = 0;

    for ch in text.chars() {
        if ch == ' ' {
            gap_len += 1;
            if gap_len == 3 {
                count += 1;
            }
        } else {
            gap_len = 0;
        }
    }

    count
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();

    let cells: Vec<&str> = if trimmed.contains('\t') {
        trimmed.split('\t').collect()
    } else if trimmed.matches('|').count() >= 2 {
        trimmed.trim_matches('|').split('|').collect()
    } else {
        trimmed.split("   ").collect()
    };

    cells
        .into_iter()
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find runs of consecutive tabular lines and split them into cells.
pub fn detect_tables(text: &str) -> Vec<ExtractedTable> {
    let mut tables = Vec::new();
    let mut current: ExtractedTable = Vec::new();

    for line in text.lines() {
        if is_tabular_line(line) {
            current.push(split_cells(line));
            continue;
        }
        if current.len() >= MIN_TABLE_ROWS {
            tables.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }

    if current.len() >= MIN_TABLE_ROWS {
        tables.push(current);
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabular_lines() {
        assert!(is_tabular_line("Item\tQty\tPrice"));
        assert!(is_tabular_line("| Milk | 2 | 3.50 |"));
        assert!(is_tabular_line("Milk     2     3.50"));
        assert!(!is_tabular_line("Thank you for shopping"));
        assert!(!is_tabular_line("a|b|"));
    }

    #[test]
    fn test_detect_tables() {
        let text = "STORE\nItem   Qty   Price\nMilk   2   3.50\nBread   1   2.25\nTotal 9.25\nA | B | C\n";
        let tables = detect_tables(text);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][1], vec!["Milk", "2", "3.50"]);
    }

    #[test]
    fn test_pipe_cells() {
        let tables = detect_tables("| a | b |\n| c | d |");
        assert_eq!(tables, vec![vec![vec!["a", "b"], vec!["c", "d"]]]);
    }
}
