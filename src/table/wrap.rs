use super::style::Align;

/// Split cell text into physical lines no wider than `width`. Embedded
/// line breaks are hard breaks and are never merged; overflowing
/// segments are chopped at the width boundary. Lines are not padded
/// here.
pub(crate) fn wrap_cell(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for segment in text.split('\n') {
        let chars: Vec<char> = segment.chars().collect();
        if chars.is_empty() || width == 0 {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

/// Justify one physical line within `width`. Centering puts the odd
/// padding character on the trailing side.
pub(crate) fn justify(line: &str, align: Align, width: usize) -> String {
    let len = line.chars().count();
    if len >= width {
        return line.to_string();
    }
    let pad = width - len;
    match align {
        Align::Left => format!("{line}{}", " ".repeat(pad)),
        Align::Right => format!("{}{line}", " ".repeat(pad)),
        Align::Center => {
            let lead = pad / 2;
            format!("{}{line}{}", " ".repeat(lead), " ".repeat(pad - lead))
        }
    }
}

/// Wrap and justify every cell of one logical row, then pad all cells
/// to the same physical-line count with blank full-width lines. The
/// result holds one line list per column.
pub(crate) fn wrap_row<S: AsRef<str>>(
    row: &[S],
    aligns: &[Align],
    widths: &[usize],
) -> Vec<Vec<String>> {
    let mut cells: Vec<Vec<String>> = row
        .iter()
        .zip(aligns.iter().zip(widths))
        .map(|(cell, (align, width))| {
            wrap_cell(cell.as_ref(), *width)
                .iter()
                .map(|line| justify(line, *align, *width))
                .collect()
        })
        .collect();
    let height = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    for (cell, width) in cells.iter_mut().zip(widths) {
        while cell.len() < height {
            cell.push(" ".repeat(*width));
        }
    }
    cells
}
