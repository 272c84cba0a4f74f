// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Enumerations and the [`Enum`] property kind.
//!
//! An [`Enumeration`] is an ordered set of allowed strings. The first value
//! is the default for [`Enum`] properties built over it. A set of common
//! enumerations is provided as lazily built statics.

use std::fmt;
use std::sync::{Arc, LazyLock};

use serde_json::Value as Json;

use crate::error::{DeserializationError, ValidationError};
use crate::primitive::json_mismatch;
use crate::property::{PropertyKind, nice_join};
use crate::value::{ModelIndex, Value};

/// An ordered set of allowed string values.
#[derive(Clone, PartialEq, Eq)]
pub struct Enumeration {
    name: Option<Arc<str>>,
    values: Arc<[Arc<str>]>,
    case_sensitive: bool,
}

impl Enumeration {
    /// Creates an anonymous, case-sensitive enumeration.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or contains duplicates.
    #[must_use]
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let values: Arc<[Arc<str>]> = values.into_iter().map(Into::into).collect();
        assert!(!values.is_empty(), "enumeration needs at least one value");
        for (i, value) in values.iter().enumerate() {
            assert!(
                !values[..i].contains(value),
                "duplicate enumeration value {value:?}"
            );
        }
        Self {
            name: None,
            values,
            case_sensitive: true,
        }
    }

    /// Creates a named, case-sensitive enumeration.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or contains duplicates.
    #[must_use]
    pub fn named<I, S>(name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(values)
        }
    }

    /// Makes membership tests ignore ASCII case.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Returns the name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if `text` is one of the values.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        if self.case_sensitive {
            self.values.iter().any(|value| &**value == text)
        } else {
            self.values.iter().any(|value| value.eq_ignore_ascii_case(text))
        }
    }

    /// Returns the values in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.values.iter().map(|value| &**value)
    }

    /// Returns the first value.
    #[must_use]
    pub fn first(&self) -> &str {
        &self.values[0]
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; enumerations cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Enumeration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.debug_tuple("Enumeration").field(name).finish(),
            None => f.debug_list().entries(self.values()).finish(),
        }
    }
}

impl fmt::Display for Enumeration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        for (i, value) in self.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value:?}")?;
        }
        Ok(())
    }
}

macro_rules! enumerations {
    ($($(#[$meta:meta])* $ident:ident = $name:literal [$($value:literal),+ $(,)?];)*) => {
        $(
            $(#[$meta])*
            pub static $ident: LazyLock<Enumeration> =
                LazyLock::new(|| Enumeration::named($name, [$($value),+]));
        )*
    };
}

enumerations! {
    /// Units for angles.
    ANGLE_UNITS = "AngleUnits" ["deg", "rad"];
    /// Units for distances: screen pixels or data space.
    SPATIAL_UNITS = "SpatialUnits" ["screen", "data"];
    /// Scatter marker shapes.
    MARKER_TYPE = "MarkerType" [
        "asterisk", "circle", "circle_cross", "circle_x", "cross", "dash", "diamond",
        "diamond_cross", "hex", "inverted_triangle", "square", "square_cross", "square_x",
        "triangle", "x",
    ];
    /// Stroke end caps.
    LINE_CAP = "LineCap" ["butt", "round", "square"];
    /// Stroke joins.
    LINE_JOIN = "LineJoin" ["miter", "round", "bevel"];
    /// Named dash patterns.
    DASH_PATTERN = "DashPattern" ["solid", "dashed", "dotted", "dotdash", "dashdot"];
    /// Font styles.
    FONT_STYLE = "FontStyle" ["normal", "italic", "bold", "bold italic"];
    /// Horizontal text alignment.
    TEXT_ALIGN = "TextAlign" ["left", "right", "center"];
    /// Vertical text anchoring.
    TEXT_BASELINE = "TextBaseline" ["top", "middle", "bottom", "alphabetic", "hanging", "ideographic"];
}

/// The CSS3 named colors, matched case-insensitively.
pub static NAMED_COLOR: LazyLock<Enumeration> = LazyLock::new(|| {
    Enumeration::named(
        "NamedColor",
        [
            "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque",
            "black", "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue",
            "chartreuse", "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan",
            "darkblue", "darkcyan", "darkgoldenrod", "darkgray", "darkgreen", "darkgrey",
            "darkkhaki", "darkmagenta", "darkolivegreen", "darkorange", "darkorchid", "darkred",
            "darksalmon", "darkseagreen", "darkslateblue", "darkslategray", "darkslategrey",
            "darkturquoise", "darkviolet", "deeppink", "deepskyblue", "dimgray", "dimgrey",
            "dodgerblue", "firebrick", "floralwhite", "forestgreen", "fuchsia", "gainsboro",
            "ghostwhite", "gold", "goldenrod", "gray", "green", "greenyellow", "grey", "honeydew",
            "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender", "lavenderblush",
            "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
            "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey", "lightpink",
            "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey",
            "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon",
            "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen",
            "mediumslateblue", "mediumspringgreen", "mediumturquoise", "mediumvioletred",
            "midnightblue", "mintcream", "mistyrose", "moccasin", "navajowhite", "navy",
            "oldlace", "olive", "olivedrab", "orange", "orangered", "orchid", "palegoldenrod",
            "palegreen", "paleturquoise", "palevioletred", "papayawhip", "peachpuff", "peru",
            "pink", "plum", "powderblue", "purple", "red", "rosybrown", "royalblue",
            "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell", "sienna", "silver",
            "skyblue", "slateblue", "slategray", "slategrey", "snow", "springgreen", "steelblue",
            "tan", "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white",
            "whitesmoke", "yellow", "yellowgreen",
        ],
    )
    .case_insensitive()
});

/// A string restricted to the values of an [`Enumeration`].
///
/// The first value of the enumeration is the intrinsic default. Null is
/// rejected; wrap in [`Nullable`](crate::Nullable) to allow it.
#[derive(Clone, Debug)]
pub struct Enum {
    enumeration: Enumeration,
}

impl Enum {
    /// Restricts values to `enumeration`.
    #[must_use]
    pub fn new(enumeration: Enumeration) -> Self {
        Self { enumeration }
    }

    /// Shorthand for an anonymous enumeration over `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty or contains duplicates.
    #[must_use]
    pub fn of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self::new(Enumeration::new(values))
    }

    /// The single value `"auto"`.
    #[must_use]
    pub fn auto() -> Self {
        Self::of(["auto"])
    }

    /// The allowed values.
    #[must_use]
    pub fn enumeration(&self) -> &Enumeration {
        &self.enumeration
    }
}

impl fmt::Display for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enum({})", self.enumeration)
    }
}

impl PropertyKind for Enum {
    fn validate(&self, value: &Value, detail: bool) -> Result<(), ValidationError> {
        match value {
            Value::String(text) if self.enumeration.contains(text) => Ok(()),
            _ => Err(ValidationError::detailed(detail, || {
                let allowed: Vec<String> =
                    self.enumeration.values().map(|v| format!("{v:?}")).collect();
                format!("invalid value: {value}; allowed values are {}", nice_join(&allowed))
            })),
        }
    }

    fn from_json(&self, json: &Json, _models: Option<&ModelIndex>) -> Result<Value, DeserializationError> {
        match json {
            Json::String(_) => Ok(Value::from(json)),
            _ => Err(json_mismatch(self, "a string", json)),
        }
    }

    fn intrinsic_default(&self) -> Option<Value> {
        Some(Value::from(self.enumeration.first()))
    }
}
