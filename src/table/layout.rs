use super::RenderError;
use super::style::StyleSpec;

/// Widest line of a cell, counting characters, with embedded line
/// breaks treated as segment boundaries.
pub(crate) fn content_width(cell: &str) -> usize {
    cell.split('\n')
        .map(|segment| segment.chars().count())
        .max()
        .unwrap_or(0)
}

/// Check that every row has the same cell count and that the column
/// style has one slot per column.
pub(crate) fn validate_shape<S: AsRef<str>>(
    table: &[Vec<S>],
    col_style: &StyleSpec,
    row_style: &StyleSpec,
) -> Result<(), RenderError> {
    let Some(first) = table.first() else {
        return Err(RenderError::EmptyTable);
    };
    let num_cols = first.len();
    for (i, row) in table.iter().enumerate() {
        if row.len() != num_cols {
            return Err(RenderError::ShapeMismatch(format!(
                "row {i} has {} cells, expected {num_cols}",
                row.len()
            )));
        }
    }
    if col_style.slot_count() != num_cols {
        return Err(RenderError::ShapeMismatch(format!(
            "column style has {} slots for {num_cols} columns",
            col_style.slot_count()
        )));
    }
    if row_style.slot_count() != table.len() {
        return Err(RenderError::ShapeMismatch(format!(
            "row style has {} slots for {} rows",
            row_style.slot_count(),
            table.len()
        )));
    }
    Ok(())
}

/// Effective rendering width of every column: the widest cell content,
/// capped by the column's limit where one is given.
pub(crate) fn column_widths<S: AsRef<str>>(
    table: &[Vec<S>],
    limits: &[Option<usize>],
) -> Vec<usize> {
    let num_cols = table.first().map(Vec::len).unwrap_or(0);
    let mut widths = vec![0; num_cols];
    for row in table {
        for (i, cell) in row.iter().enumerate() {
            let mut width = content_width(cell.as_ref());
            if let Some(Some(limit)) = limits.get(i) {
                width = width.min(*limit);
            }
            widths[i] = widths[i].max(width);
        }
    }
    widths
}
