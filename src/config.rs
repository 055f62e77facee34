//! Simulation configuration loaded from a JSON file.
//!
//! Scene subtrees are kept as raw JSON and materialised into
//! [`SceneObject`]s only when the fields exist, so the config itself stays
//! independent of the engine's state.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use eddy_fluids::mac_2d::MacGrid2D;
use eddy_fluids::pressure::SolverKind;
use eddy_fluids::scene::SceneObject;
use eddy_fluids::Real;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pressure-grid extents.
    pub nx: usize,
    pub ny: usize,
    /// Cell pitches.
    pub dx: f64,
    pub dy: f64,
    /// Time-step size.
    pub dt: f64,
    /// Number of steps to simulate.
    pub nt: usize,
    /// Fluid density.
    pub density: f64,

    /// Emit output every N-th step.
    pub sampling_rate: usize,
    pub folder: String,
    /// Base filename. Reserved, not used at runtime.
    pub filename: String,

    pub write_u: bool,
    pub write_v: bool,
    pub write_p: bool,
    pub write_div: bool,
    pub write_norm_velocity: bool,
    pub write_smoke: bool,

    pub solver: SolverConfig,

    // Scene primitive subtrees, resolved in `scene()`.
    velocityu: Option<Value>,
    velocityv: Option<Value>,
    solid: Option<Value>,
    smoke: Option<Value>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nx: 100,
            ny: 100,
            dx: 0.01,
            dy: 0.01,
            dt: 1e-4,
            nt: 100,
            density: 1000.0,
            sampling_rate: 1,
            folder: "results".into(),
            filename: "simulation".into(),
            write_u: true,
            write_v: true,
            write_p: true,
            write_div: false,
            write_norm_velocity: false,
            write_smoke: false,
            solver: SolverConfig::default(),
            velocityu: None,
            velocityv: None,
            solid: None,
            smoke: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            kind: "gauss_seidel".into(),
            max_iterations: 1000,
            tolerance: 1e-2,
        }
    }
}

impl SolverConfig {
    /// Solver selected by the config. Unknown names fall back to
    /// Gauss-Seidel with a warning so newer config files keep running.
    pub fn solver_kind(&self) -> SolverKind {
        match self.kind.as_str() {
            "jacobi" => SolverKind::Jacobi,
            "gauss_seidel" => SolverKind::GaussSeidel,
            "red_black_gauss_seidel" => SolverKind::RedBlackGaussSeidel,
            other => {
                log::warn!("unknown solver type '{other}', defaulting to gauss_seidel");
                SolverKind::GaussSeidel
            }
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("nx", self.nx as f64),
            ("ny", self.ny as f64),
            ("dx", self.dx),
            ("dy", self.dy),
            ("dt", self.dt),
            ("density", self.density),
            ("sampling_rate", self.sampling_rate as f64),
        ];
        for (key, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::Validation(format!("{key} must be positive")));
            }
        }
        Ok(())
    }

    /// Materialise the scene subtrees into primitives. Coordinates may be
    /// arithmetic expressions over `nx` and `ny`.
    pub fn scene(&self) -> Result<SceneLayout, ConfigError> {
        let vars = [("nx", self.nx as i64), ("ny", self.ny as i64)];
        Ok(SceneLayout {
            velocity_u: parse_scene_objects(self.velocityu.as_ref(), &vars)?,
            velocity_v: parse_scene_objects(self.velocityv.as_ref(), &vars)?,
            solid: parse_scene_objects(self.solid.as_ref(), &vars)?,
            smoke: parse_scene_objects(self.smoke.as_ref(), &vars)?,
        })
    }
}

/// Scene primitives grouped by the operation they are applied with.
#[derive(Debug, Default)]
pub struct SceneLayout {
    pub velocity_u: Vec<SceneObject>,
    pub velocity_v: Vec<SceneObject>,
    pub solid: Vec<SceneObject>,
    pub smoke: Vec<SceneObject>,
}

impl SceneLayout {
    /// Apply every primitive to the fields, once. The primitives carry no
    /// runtime state and are not needed afterwards.
    pub fn apply(&self, mac: &mut MacGrid2D) {
        for obj in &self.velocity_u {
            obj.apply_velocity_u(mac);
        }
        for obj in &self.velocity_v {
            obj.apply_velocity_v(mac);
        }
        for obj in &self.solid {
            obj.apply_solid(mac);
        }
        for obj in &self.smoke {
            obj.apply_smoke(mac);
        }
    }
}

/// Parse one scene subtree: a JSON object mapping primitive type names to a
/// primitive object or an array of them. Unknown type names are skipped
/// with a warning.
fn parse_scene_objects(
    node: Option<&Value>,
    vars: &[(&str, i64)],
) -> Result<Vec<SceneObject>, ConfigError> {
    let Some(node) = node else {
        return Ok(Vec::new());
    };
    let Some(map) = node.as_object() else {
        return Err(ConfigError::Validation(
            "scene node must be a JSON object".into(),
        ));
    };

    let mut objects = Vec::new();
    for (type_name, value) in map {
        match value {
            Value::Array(entries) => {
                for entry in entries {
                    objects.extend(make_scene_object(type_name, entry, vars)?);
                }
            }
            Value::Object(_) => objects.extend(make_scene_object(type_name, value, vars)?),
            _ => log::warn!("scene entry '{type_name}' must be an object or array, ignored"),
        }
    }
    Ok(objects)
}

fn make_scene_object(
    type_name: &str,
    value: &Value,
    vars: &[(&str, i64)],
) -> Result<Option<SceneObject>, ConfigError> {
    let coord = |key: &str| -> Result<i64, ConfigError> {
        match value.get(key) {
            Some(v) => resolve_int(v, vars),
            None => Ok(0),
        }
    };

    match type_name {
        "rectangle" => Ok(Some(SceneObject::Rectangle {
            val: value.get("val").and_then(Value::as_f64).unwrap_or(0.0) as Real,
            x1: coord("x1")?,
            y1: coord("y1")?,
            x2: coord("x2")?,
            y2: coord("y2")?,
        })),
        "cylinder" => Ok(Some(SceneObject::Cylinder {
            cx: coord("x")?,
            cy: coord("y")?,
            r: coord("r")?,
        })),
        other => {
            log::warn!("unknown scene object type '{other}', ignored");
            Ok(None)
        }
    }
}

/// Evaluate an integer config value: either a bare JSON integer or a string
/// expression `signed_int (op signed_int)*` with `op` in `+ - * /`,
/// evaluated left to right. Variable names are substituted longest-first so
/// a short name never clobbers part of a longer one.
pub fn resolve_int(value: &Value, vars: &[(&str, i64)]) -> Result<i64, ConfigError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    let Some(raw) = value.as_str() else {
        return Err(ConfigError::Expression(format!(
            "expected an integer or a string expression, got {value}"
        )));
    };

    let mut sorted: Vec<(&str, i64)> = vars.to_vec();
    sorted.sort_by_key(|&(name, _)| std::cmp::Reverse(name.len()));

    let mut expr = raw.to_string();
    for (name, v) in sorted {
        expr = expr.replace(name, &v.to_string());
    }

    eval_expr(&expr)
}

fn eval_expr(expr: &str) -> Result<i64, ConfigError> {
    let s = expr.as_bytes();
    let mut pos = 0usize;

    skip_spaces(s, &mut pos);
    if pos >= s.len() {
        return Err(ConfigError::Expression(format!(
            "empty expression '{expr}'"
        )));
    }

    let mut result = parse_number(s, &mut pos, expr)?;
    skip_spaces(s, &mut pos);

    while pos < s.len() {
        let op = s[pos];
        pos += 1;
        skip_spaces(s, &mut pos);
        let operand = parse_number(s, &mut pos, expr)?;
        skip_spaces(s, &mut pos);

        result = match op {
            b'+' => result + operand,
            b'-' => result - operand,
            b'*' => result * operand,
            b'/' => {
                if operand == 0 {
                    return Err(ConfigError::Expression(format!(
                        "division by zero in '{expr}'"
                    )));
                }
                result / operand
            }
            other => {
                return Err(ConfigError::Expression(format!(
                    "unknown operator '{}' in '{expr}'",
                    other as char
                )))
            }
        };
    }

    Ok(result)
}

fn skip_spaces(s: &[u8], pos: &mut usize) {
    while *pos < s.len() && s[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
}

fn parse_number(s: &[u8], pos: &mut usize, expr: &str) -> Result<i64, ConfigError> {
    let start = *pos;
    if *pos < s.len() && (s[*pos] == b'+' || s[*pos] == b'-') {
        *pos += 1;
    }
    let digits = *pos;
    while *pos < s.len() && s[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == digits {
        return Err(ConfigError::Expression(format!(
            "expected an integer at '{}'",
            &expr[start..]
        )));
    }

    expr[start..*pos]
        .parse()
        .map_err(|e| ConfigError::Expression(format!("bad integer in '{expr}': {e}")))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
    #[error("scene expression error: {0}")]
    Expression(String),
}
