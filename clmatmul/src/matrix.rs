//! Text matrix files
//!
//! Input is whitespace separated: `cols_b inner rows_a`, then A row-major,
//! then B row-major. B is kept transposed in memory so that the kernel reads
//! its columns contiguously. Output is `cols rows` followed by the result rows.

use crate::{geometry::Dims, MatmulError};
use std::{fmt::Write, path::Path};

/// Operands of a single multiplication
#[derive(Debug, Clone, PartialEq)]
pub struct Operands {
    pub dims: Dims,
    /// `rows * inner` elements, row-major
    pub a: Vec<f32>,
    /// `inner * cols` elements, `b[col * inner + k]` holds row `k` of column `col`
    pub b: Vec<f32>,
}

/// Reads input matrices from file at `path`
pub fn read_operands(path: impl AsRef<Path>) -> Result<Operands, MatmulError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| MatmulError::io_error(path, e))?;
    parse_operands(&text)
}

pub fn parse_operands(text: &str) -> Result<Operands, MatmulError> {
    let mut tokens = text.split_ascii_whitespace();
    let cols = parse_dim(tokens.next(), "number of columns of the second matrix")?;
    let inner = parse_dim(tokens.next(), "inner dimension")?;
    let rows = parse_dim(tokens.next(), "number of rows of the first matrix")?;
    let dims = Dims { rows, inner, cols };
    if rows.checked_mul(inner).is_none()
        || inner.checked_mul(cols).is_none()
        || rows.checked_mul(cols).is_none()
    {
        return Err(MatmulError::parse_error(
            format!("Invalid matrix sizes {cols} {inner} {rows}").into(),
        ));
    }

    let mut a = alloc(dims.a_len())?;
    for i in 0..dims.a_len() {
        a.push(parse_value(tokens.next(), "first", i)?);
    }
    let mut b = alloc(dims.b_len())?;
    b.resize(dims.b_len(), 0.0);
    for k in 0..inner {
        for col in 0..cols {
            b[col * inner + k] = parse_value(tokens.next(), "second", k * cols + col)?;
        }
    }
    Ok(Operands { dims, a, b })
}

fn parse_dim(token: Option<&str>, what: &str) -> Result<usize, MatmulError> {
    let Some(token) = token else {
        return Err(MatmulError::parse_error(format!("missing {what}").into()));
    };
    match token.parse::<usize>() {
        Ok(0) => Err(MatmulError::parse_error(format!("{what} is zero").into())),
        Ok(dim) => Ok(dim),
        Err(e) => Err(MatmulError::parse_error(format!("{what} {token:?}, {e}").into())),
    }
}

fn parse_value(token: Option<&str>, matrix: &str, index: usize) -> Result<f32, MatmulError> {
    let Some(token) = token else {
        return Err(MatmulError::parse_error(
            format!("missing element {index} of the {matrix} matrix").into(),
        ));
    };
    token.parse().map_err(|e| {
        MatmulError::parse_error(
            format!("element {index} of the {matrix} matrix {token:?}, {e}").into(),
        )
    })
}

/// Vector with capacity for `len` elements, reports failure instead of aborting
pub(crate) fn alloc(len: usize) -> Result<Vec<f32>, MatmulError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|e| {
        MatmulError::AllocationError(format!("Insufficient memory for {len} elements, {e}").into())
    })?;
    Ok(data)
}

/// Renders result matrix of `dims.rows` rows and `dims.cols` columns
#[must_use]
pub fn format_result(dims: &Dims, result: &[f32]) -> String {
    debug_assert_eq!(result.len(), dims.result_len());
    let mut text = format!("{} {}\n", dims.cols, dims.rows);
    for row in result.chunks(dims.cols) {
        for x in row {
            let _ = write!(text, "{x:.6} ");
        }
        text.push('\n');
    }
    text
}

/// Writes result matrix to file at `path`, replacing its contents
pub fn write_result(path: impl AsRef<Path>, dims: &Dims, result: &[f32]) -> Result<(), MatmulError> {
    let path = path.as_ref();
    std::fs::write(path, format_result(dims, result)).map_err(|e| MatmulError::io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_second_matrix() {
        let operands = parse_operands("2 2 2\n1 2\n3 4\n5 6\n7 8\n").unwrap();
        assert_eq!(operands.dims, Dims { rows: 2, inner: 2, cols: 2 });
        assert_eq!(operands.a, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(operands.b, [5.0, 7.0, 6.0, 8.0]);
    }

    #[test]
    fn rectangular() {
        // A is 1x3, B is 3x2
        let operands = parse_operands("2 3 1  1 2 3  1 2\n3 4\n5 6").unwrap();
        assert_eq!(operands.dims, Dims { rows: 1, inner: 3, cols: 2 });
        assert_eq!(operands.b, [1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn malformed() {
        for text in [
            "",
            "2 2",
            "2 x 2",
            "0 2 2",
            "2 2 2 1 2 3 4 5 6 7",
            "2 2 2 1 2 3 four 5 6 7 8",
            "-1 2 2",
        ] {
            let result = parse_operands(text);
            assert!(matches!(result, Err(MatmulError::ParseError(_))), "{text:?} {result:?}");
        }
    }

    #[test]
    fn overflowing_sizes() {
        let text = format!("{} {} 1", usize::MAX, 2);
        assert!(matches!(parse_operands(&text), Err(MatmulError::ParseError(_))));
    }

    #[test]
    fn result_text() {
        let dims = Dims { rows: 2, inner: 5, cols: 3 };
        let text = format_result(&dims, &[1.0, 2.5, -3.0, 0.0, 1e-7, 100.0]);
        assert_eq!(
            text,
            "3 2\n1.000000 2.500000 -3.000000 \n0.000000 0.000000 100.000000 \n"
        );
    }
}
