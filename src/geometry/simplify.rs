use geo::{MultiLineString, Simplify};

/// Douglas-Peucker tolerance in meters for a simplify level (0 = off)
///
/// Scales with the hexagon size so a tile keeps a similar vertex budget
/// whatever its footprint.
pub fn road_epsilon(hex_size_m: f64, level: u8) -> f64 {
    let fraction = match level {
        0 => return 0.0,
        1 => 0.002,
        2 => 0.005,
        _ => 0.01,
    };
    hex_size_m * fraction
}

/// Simplify road lines; lines too short to lose points are left alone
pub fn simplify_lines(lines: &MultiLineString<f64>, epsilon: f64) -> MultiLineString<f64> {
    if epsilon <= 0.0 {
        return lines.clone();
    }

    MultiLineString::new(
        lines
            .iter()
            .map(|line| {
                if line.0.len() < 4 {
                    line.clone()
                } else {
                    line.simplify(&epsilon)
                }
            })
            .collect(),
    )
}
