//! Coordinate reference systems in OGC Well-Known Text (WKT 1).
//!
//! The projection engine only reads PROJ strings. Geographic and projected WKT systems are
//! translated into one, and systems with an `EPSG` authority can be looked up by their code.

/// Returns whether `definition` starts like WKT, i.e., with a keyword followed by a bracket.
pub(crate) fn is_wkt(definition: &str) -> bool {
    let definition = definition.trim_start();
    definition.find(['[', '(']).is_some_and(|end| {
        let keyword = definition[..end].trim_end();
        keyword.starts_with(|c: char| c.is_ascii_alphabetic())
            && keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// A parsed WKT coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WktCrs {
    root: Node,
}

impl WktCrs {
    pub(crate) fn parse(definition: &str) -> Result<Self, String> {
        let mut parser = Parser {
            rest: definition.trim(),
        };
        let root = parser.node()?;
        if !parser.rest.trim().is_empty() {
            return Err(format!("unexpected text after {}", root.keyword));
        }
        Ok(Self { root })
    }

    /// The EPSG code of the whole system, from its `AUTHORITY` or `ID` node.
    pub(crate) fn epsg_code(&self) -> Option<u16> {
        let authority = self
            .root
            .child("AUTHORITY")
            .or_else(|| self.root.child("ID"))?;
        if !authority.text(0)?.eq_ignore_ascii_case("epsg") {
            return None;
        }
        match authority.values.get(1)? {
            Value::Text(code) => code.trim().parse().ok(),
            Value::Number(code) => format!("{code}").parse().ok(),
            Value::Node(_) => None,
        }
    }

    /// Translates the system into a PROJ string.
    pub(crate) fn to_proj_string(&self) -> Result<String, String> {
        match self.root.keyword.as_str() {
            "GEOGCS" => {
                let geographic = Geographic::from_node(&self.root)?;
                Ok(format!(
                    "+proj=longlat {} +no_defs",
                    geographic.parameters.join(" ")
                ))
            }
            "PROJCS" => projected(&self.root),
            other => Err(format!("{other} coordinate systems are not supported")),
        }
    }
}

/// The ellipsoid, datum shift and angular unit of a `GEOGCS`.
struct Geographic {
    parameters: Vec<String>,
    /// Degrees per angular unit.
    degrees_per_unit: f64,
}

impl Geographic {
    fn from_node(geogcs: &Node) -> Result<Self, String> {
        let datum = geogcs.child("DATUM").ok_or("GEOGCS without DATUM")?;
        let spheroid = datum
            .child("SPHEROID")
            .or_else(|| datum.child("ELLIPSOID"))
            .ok_or("DATUM without SPHEROID")?;
        let (Some(semi_major_axis), Some(inverse_flattening)) =
            (spheroid.number(1), spheroid.number(2))
        else {
            return Err("SPHEROID needs a semi-major axis and an inverse flattening".to_owned());
        };

        let mut parameters = vec![format!("+a={semi_major_axis}")];
        if inverse_flattening == 0.0 {
            parameters.push(format!("+b={semi_major_axis}"));
        } else {
            parameters.push(format!("+rf={inverse_flattening}"));
        }
        if let Some(to_wgs84) = datum.child("TOWGS84") {
            let shift = to_wgs84
                .values
                .iter()
                .map(|value| match value {
                    Value::Number(number) => Ok(number.to_string()),
                    _ => Err("TOWGS84 must only contain numbers".to_owned()),
                })
                .collect::<Result<Vec<_>, _>>()?;
            parameters.push(format!("+towgs84={}", shift.join(",")));
        }

        let degrees_per_unit = geogcs
            .child("UNIT")
            .and_then(|unit| unit.number(1))
            .map_or(1.0, |radians| {
                // The radians per degree are rounded in most definitions.
                let degrees = radians.to_degrees();
                if (degrees - 1.0).abs() < 1e-9 {
                    1.0
                } else {
                    degrees
                }
            });
        if let Some(meridian) = geogcs
            .child("PRIMEM")
            .and_then(|primem| primem.number(1))
            .filter(|meridian| *meridian != 0.0)
        {
            parameters.push(format!("+pm={}", meridian * degrees_per_unit));
        }
        Ok(Self {
            parameters,
            degrees_per_unit,
        })
    }
}

/// How a WKT parameter value is converted into its PROJ counterpart.
#[derive(Debug, Clone, Copy)]
enum Quantity {
    Angle,
    Length,
    Scale,
}

fn projected(projcs: &Node) -> Result<String, String> {
    let geogcs = projcs.child("GEOGCS").ok_or("PROJCS without GEOGCS")?;
    let geographic = Geographic::from_node(geogcs)?;
    let method = projcs
        .child("PROJECTION")
        .and_then(|projection| projection.text(0))
        .ok_or("PROJCS without PROJECTION")?
        .to_ascii_lowercase()
        .replace(' ', "_");
    let meters_per_unit = projcs
        .child("UNIT")
        .and_then(|unit| unit.number(1))
        .unwrap_or(1.0);

    let mut parameters = Vec::<(&'static str, f64)>::new();
    for parameter in projcs.children("PARAMETER") {
        let (Some(name), Some(value)) = (parameter.text(0), parameter.number(1)) else {
            return Err("PARAMETER needs a name and a number".to_owned());
        };
        let name = name.to_ascii_lowercase().replace(' ', "_");
        let (key, quantity) = match name.as_str() {
            "latitude_of_origin" | "latitude_of_center" => ("lat_0", Quantity::Angle),
            "central_meridian" | "longitude_of_center" | "longitude_of_origin" => {
                ("lon_0", Quantity::Angle)
            }
            "standard_parallel_1" => ("lat_1", Quantity::Angle),
            "standard_parallel_2" => ("lat_2", Quantity::Angle),
            "scale_factor" => ("k_0", Quantity::Scale),
            "false_easting" => ("x_0", Quantity::Length),
            "false_northing" => ("y_0", Quantity::Length),
            _ => {
                tracing::debug!("Ignoring the WKT parameter {name}");
                continue;
            }
        };
        let value = match quantity {
            Quantity::Angle => value * geographic.degrees_per_unit,
            Quantity::Length => value * meters_per_unit,
            Quantity::Scale => value,
        };
        parameters.push((key, value));
    }

    let mut ellipsoid = geographic.parameters;
    let projection = match method.as_str() {
        "transverse_mercator" | "gauss_kruger" => "tmerc",
        "mercator" | "mercator_1sp" => "merc",
        "mercator_2sp" => {
            rename(&mut parameters, "lat_1", "lat_ts");
            "merc"
        }
        "popular_visualisation_pseudo_mercator" | "mercator_auxiliary_sphere" => {
            let radius = geogcs
                .child("DATUM")
                .and_then(|datum| datum.child("SPHEROID"))
                .and_then(|spheroid| spheroid.number(1))
                .ok_or("SPHEROID needs a semi-major axis")?;
            ellipsoid = vec![
                format!("+a={radius}"),
                format!("+b={radius}"),
                "+nadgrids=@null".to_owned(),
            ];
            "merc"
        }
        "lambert_conformal_conic_1sp" => {
            if let Some(latitude) = value_of(&parameters, "lat_0") {
                parameters.push(("lat_1", latitude));
            }
            "lcc"
        }
        "lambert_conformal_conic" | "lambert_conformal_conic_2sp" => "lcc",
        "polar_stereographic" => {
            let latitude = value_of(&parameters, "lat_0").unwrap_or(90.0);
            parameters.retain(|(key, _)| *key != "lat_0");
            parameters.push(("lat_0", 90.0_f64.copysign(latitude)));
            parameters.push(("lat_ts", latitude));
            "stere"
        }
        "oblique_stereographic" | "double_stereographic" => "sterea",
        "albers" | "albers_conic_equal_area" => "aea",
        "lambert_azimuthal_equal_area" => "laea",
        "equirectangular" | "equidistant_cylindrical" | "plate_carree" => "eqc",
        other => return Err(format!("the projection method {other} is not supported")),
    };

    let mut proj_string = vec![format!("+proj={projection}")];
    proj_string.extend(
        parameters
            .into_iter()
            .map(|(key, value)| format!("+{key}={value}")),
    );
    proj_string.extend(ellipsoid);
    proj_string.push(if meters_per_unit == 1.0 {
        "+units=m".to_owned()
    } else {
        format!("+to_meter={meters_per_unit}")
    });
    proj_string.push("+no_defs".to_owned());
    Ok(proj_string.join(" "))
}

fn value_of(parameters: &[(&'static str, f64)], key: &str) -> Option<f64> {
    parameters
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, value)| *value)
}

fn rename(parameters: &mut [(&'static str, f64)], from: &str, to: &'static str) {
    for (key, _) in parameters.iter_mut().filter(|(key, _)| *key == from) {
        *key = to;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    /// Upper case.
    keyword: String,
    values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    /// A quoted string or a bare word like `EAST`.
    Text(String),
    Number(f64),
    Node(Node),
}

impl Node {
    fn child(&self, keyword: &str) -> Option<&Node> {
        self.values.iter().find_map(|value| match value {
            Value::Node(node) if node.keyword == keyword => Some(node),
            _ => None,
        })
    }

    fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Node> {
        self.values.iter().filter_map(move |value| match value {
            Value::Node(node) if node.keyword == keyword => Some(node),
            _ => None,
        })
    }

    fn text(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    fn number(&self, index: usize) -> Option<f64> {
        match self.values.get(index)? {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }
}

struct Parser<'a> {
    rest: &'a str,
}

impl Parser<'_> {
    fn node(&mut self) -> Result<Node, String> {
        let keyword = self.word();
        if keyword.is_empty() {
            return Err(self.unexpected("a keyword"));
        }
        self.node_with_keyword(keyword)
    }

    fn node_with_keyword(&mut self, keyword: String) -> Result<Node, String> {
        let close = match self.next_char() {
            Some('[') => ']',
            Some('(') => ')',
            _ => return Err(format!("expected a bracket after {keyword}")),
        };
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.rest.starts_with(close) {
            self.next_char();
        } else {
            loop {
                values.push(self.value()?);
                match self.next_char() {
                    Some(',') => {}
                    Some(c) if c == close => break,
                    _ => return Err(format!("unterminated {keyword}")),
                }
            }
        }
        Ok(Node {
            keyword: keyword.to_ascii_uppercase(),
            values,
        })
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_whitespace();
        if self.rest.starts_with('"') {
            return self.quoted().map(Value::Text);
        }
        let word = self.word();
        if word.is_empty() {
            return Err(self.unexpected("a value"));
        }
        self.skip_whitespace();
        if self.rest.starts_with(['[', '(']) {
            return self.node_with_keyword(word).map(Value::Node);
        }
        Ok(match word.parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(word),
        })
    }

    /// A quoted string, where `""` stands for a quote.
    fn quoted(&mut self) -> Result<String, String> {
        self.next_char();
        let mut text = String::new();
        loop {
            match self.next_char() {
                Some('"') if self.rest.starts_with('"') => {
                    self.next_char();
                    text.push('"');
                }
                Some('"') => return Ok(text),
                Some(c) => text.push(c),
                None => return Err("unterminated string".to_owned()),
            }
        }
    }

    fn word(&mut self) -> String {
        self.skip_whitespace();
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')))
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        word.to_owned()
    }

    fn next_char(&mut self) -> Option<char> {
        self.skip_whitespace();
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn unexpected(&self, expected: &str) -> String {
        match self.rest.chars().next() {
            Some(c) => format!("expected {expected}, found '{c}'"),
            None => format!("expected {expected}, found the end of the definition"),
        }
    }
}
