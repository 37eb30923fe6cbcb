/*
This file is part of the OSM Road Comparison Tool
Copyright (C) 2022 Novel-T

The OSM Road Comparison Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

/// Angle in degrees between two lines given by their angular coefficients
pub fn slope_angle_difference(m_ref: f64, m_osm: f64) -> f64 {
    let denom = 1. + m_ref * m_osm;
    if denom == 0. {
        // perpendicular
        return 90.;
    }
    ((m_ref - m_osm) / denom).atan().abs().to_degrees()
}

pub fn within_threshold(angle: f64, threshold: f64) -> bool {
    angle <= threshold
}
