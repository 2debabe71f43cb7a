//! Minimal IGES reader for section outlines.
//!
//! IGES files are 80 column records with the section letter in column 73.
//! Only the parameter data section is needed here: point entities (type 116)
//! are collected in directory order and form the outline of the section.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::errors::IgesError;
use crate::geometry::{point, Point};

/// IGES entity type code for a point.
pub const POINT_ENTITY: i32 = 116;

/// Width of the data field in a parameter record.
const PARAMETER_WIDTH: usize = 64;

/// One entity from the parameter data section.
#[derive(Clone, Debug, PartialEq)]
pub struct IgesEntity {
    /// Directory entry pointer the parameters belong to.
    pub pointer: usize,
    /// Entity type number.
    pub type_code: i32,
    /// Remaining comma separated fields as written.
    pub fields: Vec<String>,
}

/// Parse every entity in the parameter data section, ordered by directory pointer.
///
/// # Errors
///
/// Returns [`IgesError::NoParameterData`] when the file has no parameter
/// records and [`IgesError::InvalidField`] when a record is malformed.
pub fn parse_entities(content: &str) -> Result<Vec<IgesEntity>, IgesError> {
    let mut records: BTreeMap<usize, String> = BTreeMap::new();
    for line in content.lines() {
        if line.get(72..73) != Some("P") {
            continue;
        }
        let data = line.get(..PARAMETER_WIDTH).unwrap_or_default();
        let pointer_text = line.get(PARAMETER_WIDTH..72).unwrap_or_default().trim();
        let pointer = pointer_text
            .parse::<usize>()
            .map_err(|_| IgesError::InvalidField {
                pointer: 0,
                field: pointer_text.to_string(),
            })?;
        records.entry(pointer).or_default().push_str(data.trim_end());
    }
    if records.is_empty() {
        return Err(IgesError::NoParameterData);
    }

    let mut entities = Vec::with_capacity(records.len());
    for (pointer, text) in records {
        let body = text.split(';').next().unwrap_or_default();
        let mut fields = body.split(',').map(|field| field.trim().to_string());
        let type_field = fields.next().unwrap_or_default();
        let type_code = type_field
            .parse::<i32>()
            .map_err(|_| IgesError::InvalidField {
                pointer,
                field: type_field.clone(),
            })?;
        entities.push(IgesEntity {
            pointer,
            type_code,
            fields: fields.collect(),
        });
    }
    Ok(entities)
}

/// Read the point entities of an IGES file as an ordered outline.
///
/// # Errors
///
/// Returns [`IgesError::NoPoints`] when the file parses but holds no points.
pub fn parse_points(content: &str) -> Result<Vec<Point>, IgesError> {
    let mut points = Vec::new();
    for entity in parse_entities(content)? {
        if entity.type_code != POINT_ENTITY {
            continue;
        }
        let mut coordinates = [0.0; 3];
        for (axis, slot) in coordinates.iter_mut().enumerate() {
            let field = entity.fields.get(axis).map(String::as_str).unwrap_or("");
            *slot = parse_real(field).ok_or_else(|| IgesError::InvalidField {
                pointer: entity.pointer,
                field: field.to_string(),
            })?;
        }
        points.push(point(coordinates[0], coordinates[1], coordinates[2]));
    }
    if points.is_empty() {
        return Err(IgesError::NoPoints);
    }
    Ok(points)
}

/// IGES reals may use `D` as the exponent marker.
fn parse_real(field: &str) -> Option<f64> {
    field.replace(['D', 'd'], "E").parse().ok()
}

/// Write an outline as a minimal IGES file of point entities.
///
/// This is the inverse of [`parse_points`] and is handy for producing
/// geometry fixtures.
///
/// # Examples
/// ```
/// use beamsec::{iges, point};
///
/// let outline = [point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0), point(0.0, 1.0, 0.0)];
/// let text = iges::write_points(&outline, "triangle");
/// assert_eq!(iges::parse_points(&text).expect("valid IGES"), outline);
/// ```
#[must_use]
pub fn write_points(points: &[Point], description: &str) -> String {
    let mut output = String::new();
    let mut line = |text: &str, section: char, sequence: usize| {
        writeln!(output, "{text:<72}{section}{sequence:>7}")
            .expect("writing to string cannot fail");
    };

    let description: String = description.chars().take(72).collect();
    line(&description, 'S', 1);
    line("1H,,1H;;", 'G', 1);

    let mut directory = 0;
    for index in 0..points.len() {
        let parameter_line = index + 1;
        let first = format!(
            "{POINT_ENTITY:>8}{parameter_line:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}",
            0, 0, 0, 0, 0, 0, "00000000"
        );
        directory += 1;
        line(&first, 'D', directory);
        let second = format!("{POINT_ENTITY:>8}{:>8}{:>8}{:>8}{:>8}", 0, 0, 1, 0);
        directory += 1;
        line(&second, 'D', directory);
    }

    for (index, p) in points.iter().enumerate() {
        let pointer = 2 * index + 1;
        let data = format!("{POINT_ENTITY},{:?},{:?},{:?};", p.x, p.y, p.z);
        let text = format!("{data:<64} {pointer:>7}");
        line(&text, 'P', index + 1);
    }

    let terminate = format!("S{:>7}G{:>7}D{directory:>7}P{:>7}", 1, 1, points.len());
    line(&terminate, 'T', 1);
    output
}
