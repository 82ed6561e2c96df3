//! Move extraction: flattens the main line of a game tree into an
//! ordered list of setup stones and numbered moves.
//!
//! Only the first child of every node is followed; variations are ignored.

use crate::error::{GameError, Result};
use crate::model::{Color, MoveKind, MoveRecord, Node, Position, Property};

/// Walk the main line and emit one record per setup stone and per move.
///
/// Within a node the order is: black setup stones, white setup stones,
/// the black move, the white move. Only the first value of a `B`/`W`
/// property is meaningful.
pub fn extract_moves(root: &Node) -> Result<Vec<MoveRecord>> {
    let mut records = Vec::new();
    let mut move_count: u32 = 0;

    for node in root.main_line() {
        for values in setup_values(node, Color::Black) {
            push_setup(&mut records, Color::Black, values)?;
        }
        for values in setup_values(node, Color::White) {
            push_setup(&mut records, Color::White, values)?;
        }
        for color in [Color::Black, Color::White] {
            if let Some(code) = move_value(node, color) {
                let position = Position::from_sgf(code)?;
                move_count += 1;
                records.push(MoveRecord {
                    kind: MoveKind::Move,
                    color,
                    position,
                    sequence_number: move_count,
                });
            }
        }
    }

    log::debug!(
        "extracted {} records ({} moves) from the main line",
        records.len(),
        move_count
    );
    Ok(records)
}

fn setup_values(node: &Node, color: Color) -> impl Iterator<Item = &[String]> {
    node.properties.iter().filter_map(move |p| match (p, color) {
        (Property::AddBlack(v), Color::Black) | (Property::AddWhite(v), Color::White) => {
            Some(v.as_slice())
        }
        _ => None,
    })
}

fn move_value(node: &Node, color: Color) -> Option<&str> {
    node.properties
        .iter()
        .find_map(|p| match (p, color) {
            (Property::Black(v), Color::Black) | (Property::White(v), Color::White) => {
                v.first()
            }
            _ => None,
        })
        .map(String::as_str)
}

fn push_setup(records: &mut Vec<MoveRecord>, color: Color, values: &[String]) -> Result<()> {
    for code in values {
        for position in decode_point_list(code)? {
            records.push(MoveRecord {
                kind: MoveKind::Setup,
                color,
                position,
                sequence_number: 0,
            });
        }
    }
    Ok(())
}

/// Decode a setup value, which may be a single point or a compressed
/// rectangle `"aa:cc"` (expanded row by row, both corners inclusive).
fn decode_point_list(code: &str) -> Result<Vec<Option<Position>>> {
    let Some((from, to)) = code.split_once(':') else {
        return Ok(vec![Position::from_sgf(code)?]);
    };
    let (Some(a), Some(b)) = (Position::from_sgf(from)?, Position::from_sgf(to)?) else {
        return Err(GameError::invalid_position(
            code,
            "a rectangle cannot use a pass as a corner",
        ));
    };
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    let mut points = Vec::with_capacity((x1 - x0 + 1) as usize * (y1 - y0 + 1) as usize);
    for y in y0..=y1 {
        for x in x0..=x1 {
            points.push(Some(Position::new(x, y)));
        }
    }
    Ok(points)
}
