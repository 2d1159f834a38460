use super::style::{StyleSpec, Token};

const RULE_CHAR: char = '-';
const CORNER_CHAR: char = '+';
const BORDER_CHAR: char = '|';

/// One full horizontal rule: a run of rule characters per column,
/// corners at border positions, pieces joined by the rule character.
fn horizontal_rule(col_style: &StyleSpec, widths: &[usize]) -> String {
    let mut pieces = Vec::new();
    let mut col = 0;
    for token in &col_style.tokens {
        match token {
            Token::Border => pieces.push(CORNER_CHAR.to_string()),
            Token::Slot(_) => {
                pieces.push(RULE_CHAR.to_string().repeat(widths[col]));
                col += 1;
            }
        }
    }
    pieces.join(&RULE_CHAR.to_string())
}

/// One physical content line: border characters and cell text joined
/// by single spaces.
fn content_line(col_style: &StyleSpec, cells: &[&str]) -> String {
    let mut pieces = Vec::new();
    let mut col = 0;
    for token in &col_style.tokens {
        match token {
            Token::Border => pieces.push(BORDER_CHAR.to_string()),
            Token::Slot(_) => {
                pieces.push(cells[col].to_string());
                col += 1;
            }
        }
    }
    pieces.join(" ")
}

/// Interleave horizontal rules and wrapped rows following the row
/// style, emitting one output line per rule and per physical line of
/// each data row. `rows` holds, per logical row, one justified line
/// list per column, all of equal height.
pub(crate) fn render_grid(
    rows: &[Vec<Vec<String>>],
    row_style: &StyleSpec,
    col_style: &StyleSpec,
    widths: &[usize],
) -> String {
    let rule = horizontal_rule(col_style, widths);
    let mut lines = Vec::new();
    let mut row_pos = 0;
    for token in &row_style.tokens {
        match token {
            Token::Border => lines.push(rule.clone()),
            Token::Slot(_) => {
                let row = &rows[row_pos];
                let height = row.first().map(Vec::len).unwrap_or(0);
                for line_idx in 0..height {
                    let cells: Vec<&str> =
                        row.iter().map(|cell| cell[line_idx].as_str()).collect();
                    lines.push(content_line(col_style, &cells));
                }
                row_pos += 1;
            }
        }
    }
    lines.join("\n")
}
