use crate::engine::Board;
use crate::error::PuzzleError;
use crate::problem::NPuzzleProblem;

/// Parses rows of whitespace-separated numbers into a `Board`.
///
/// Each string slice is one row, starting from row 0. The side length is the
/// number of rows; every row must hold exactly that many values. A `.` or `_`
/// may stand for the blank.
///
/// # Arguments
/// * `rows`: The rows of the board, top to bottom.
///
/// # Returns
/// * `Ok(Board)` if every row parses and the values form a valid board.
/// * `Err(PuzzleError::Parse)` naming the 1-based row of the first bad value
///   or short row.
/// * `Err(PuzzleError)` from [`Board::new`] if the values are not a
///   permutation or the size is unsupported.
///
/// # Examples
/// ```
/// use npuzzle_solver::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["1 2 3", "4 5 6", "7 8 ."]).unwrap();
/// assert_eq!(board.size(), 3);
/// assert_eq!(board.blank(), (2, 2));
/// assert_eq!(board.tile(1, 0), 4);
///
/// assert!(board_from_str_array(&["1 2", "3 x"]).is_err());
/// assert!(board_from_str_array(&["1 2 3", "0"]).is_err());
/// ```
pub fn board_from_str_array(rows: &[&str]) -> Result<Board, PuzzleError> {
    let size = rows.len();
    let mut cells = Vec::with_capacity(size * size);
    for (r, row) in rows.iter().enumerate() {
        let before = cells.len();
        for token in row.split_whitespace() {
            cells.push(parse_cell(token, r + 1)?);
        }
        let found = cells.len() - before;
        if found != size {
            return Err(PuzzleError::Parse {
                line: r + 1,
                reason: format!("expected {} values in the row, found {}", size, found),
            });
        }
    }
    Board::new(size, cells)
}

fn parse_cell(token: &str, line: usize) -> Result<u8, PuzzleError> {
    if token == "." || token == "_" {
        return Ok(0);
    }
    token.parse::<u8>().map_err(|e| PuzzleError::Parse {
        line,
        reason: format!("'{}' is not a tile value ({})", token, e),
    })
}

/// Parses one problem line: `size`, then the N² initial cells, then the N²
/// goal cells, all whitespace-separated and row-major.
///
/// # Arguments
/// * `line`: The text of the line.
/// * `line_number`: 1-based number used in error messages.
///
/// # Examples
/// ```
/// use npuzzle_solver::utils::parse_problem_line;
///
/// let problem = parse_problem_line("2 1 2 0 3 1 2 3 0", 1).unwrap();
/// assert_eq!(problem.initial().blank(), (1, 0));
/// assert!(parse_problem_line("2 1 2 0 3", 1).is_err());
/// ```
pub fn parse_problem_line(line: &str, line_number: usize) -> Result<NPuzzleProblem, PuzzleError> {
    let parse_error = |reason: String| PuzzleError::Parse {
        line: line_number,
        reason,
    };
    let mut tokens = line.split_whitespace();
    let size: usize = tokens
        .next()
        .ok_or_else(|| parse_error("empty line".to_string()))?
        .parse()
        .map_err(|e| parse_error(format!("bad board size: {}", e)))?;
    let values = tokens
        .map(|t| parse_cell(t, line_number))
        .collect::<Result<Vec<u8>, _>>()?;

    let cells = size
        .checked_mul(size)
        .ok_or_else(|| parse_error(format!("board size {} is too large", size)))?;
    if values.len() != 2 * cells {
        return Err(parse_error(format!(
            "a {}x{} problem needs {} values after the size, found {}",
            size,
            size,
            2 * cells,
            values.len()
        )));
    }
    let (initial, goal) = values.split_at(cells);
    let initial = Board::new(size, initial.to_vec()).map_err(|e| parse_error(format!("initial board: {}", e)))?;
    let goal = Board::new(size, goal.to_vec()).map_err(|e| parse_error(format!("goal board: {}", e)))?;
    NPuzzleProblem::new(initial, goal)
}

/// Parses every problem in `text`, one per line.
///
/// Blank lines and lines starting with `#` are skipped. The first bad line
/// stops parsing.
pub fn parse_problems(text: &str) -> Result<Vec<NPuzzleProblem>, PuzzleError> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| parse_problem_line(line, number))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;

    #[test]
    fn test_board_from_str_array_valid() {
        let board = board_from_str_array(&["8 6 7", "2 5 4", "3 0 1"]).unwrap();
        assert_eq!(board.cells(), &[8, 6, 7, 2, 5, 4, 3, 0, 1]);
        assert_eq!(board.blank(), (2, 1));
    }

    #[test]
    fn test_board_from_str_array_extra_spaces() {
        let board = board_from_str_array(&["  1   2 ", "\t3 _"]).unwrap();
        assert_eq!(board, Board::solved(2).unwrap());
    }

    #[test]
    fn test_board_from_str_array_errors() {
        assert!(matches!(
            board_from_str_array(&["1 2", "3 0 4"]),
            Err(PuzzleError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            board_from_str_array(&["1 2", "3 300"]),
            Err(PuzzleError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            board_from_str_array(&["1 1", "3 0"]),
            Err(PuzzleError::NotAPermutation { .. })
        ));
        assert!(matches!(
            board_from_str_array(&["0"]),
            Err(PuzzleError::UnsupportedSize(1))
        ));
    }

    #[test]
    fn test_parse_problem_line() {
        let problem = parse_problem_line("3 8 6 7 2 5 4 3 0 1 1 2 3 4 5 6 7 8 0", 1).unwrap();
        assert_eq!(problem.size(), 3);
        assert_eq!(problem.initial().tile(0, 0), 8);
        assert_eq!(problem.goal(), &Board::solved(3).unwrap());
        assert!(problem.solvable());
    }

    #[test]
    fn test_parse_problem_line_errors() {
        for bad in ["", "x 1 2 3 0 1 2 3 0", "2 1 2 3 0 1 2 3", "2 1 2 3 0 1 2 3 3", "2 1 2 3 0 1 2 3 0 9"] {
            assert!(matches!(
                parse_problem_line(bad, 7),
                Err(PuzzleError::Parse { line: 7, .. })
            ), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_problems_skips_comments_and_reports_line() {
        let text = "# sample instances\n\n2 1 2 3 0 1 2 3 0\n3 1 2 3 4 5 6 7 0 8 1 2 3 4 5 6 7 8 0\n";
        let problems = parse_problems(text).unwrap();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[1].size(), 3);

        let broken = "2 1 2 3 0 1 2 3 0\n\n2 1 2 3\n";
        assert!(matches!(
            parse_problems(broken),
            Err(PuzzleError::Parse { line: 3, .. })
        ));
    }
}
