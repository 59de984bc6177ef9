/*!
    Effect definitions and their option strings.
*/

use std::fmt;

use serde::{Deserialize, Serialize};

use media_types::{Error, Result};

/**
    A requested effect: a registered name plus an option string.

    The option string uses FFmpeg filter syntax, either `key=value` pairs
    or positional values separated by `:`, for example
    `volume=0.5` or `0.6:0.3:1000:0.5`. Nothing is validated until a
    chain is built from the definition.
*/
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub name: String,
    #[serde(default)]
    pub params: String,
}

impl EffectDefinition {
    pub fn new(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
        }
    }

    /**
        Parse `name` or `name=params`, the form used on command lines.
    */
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let (name, params) = spec.split_once('=').unwrap_or((spec, ""));
        if name.is_empty() {
            return Err(Error::invalid_effect(spec, "missing effect name"));
        }
        Ok(Self::new(name, params))
    }
}

impl fmt::Display for EffectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}={}", self.name, self.params)
        }
    }
}

/**
    Parsed options of one effect, checked against the names it accepts.

    `names` lists each option in positional order; every entry holds the
    canonical name first, followed by any short aliases.
*/
#[derive(Clone, Debug)]
pub struct EffectOptions {
    effect: String,
    names: &'static [&'static [&'static str]],
    values: Vec<Option<String>>,
}

impl EffectOptions {
    pub fn parse(
        effect: &str,
        params: &str,
        names: &'static [&'static [&'static str]],
    ) -> Result<Self> {
        let mut values = vec![None; names.len()];
        let mut named = false;

        for (position, token) in split_unescaped(params).into_iter().enumerate() {
            if token.is_empty() {
                return Err(Error::invalid_effect(effect, format!("empty option in '{params}'")));
            }
            let index = match token.split_once('=') {
                Some((key, value)) => {
                    named = true;
                    let index = names
                        .iter()
                        .position(|spellings| spellings.contains(&key))
                        .ok_or_else(|| {
                            Error::invalid_effect(effect, format!("unknown option '{key}'"))
                        })?;
                    values[index] = Some(value.to_string());
                    index
                }
                None if named => {
                    return Err(Error::invalid_effect(
                        effect,
                        format!("positional value '{token}' after named options"),
                    ));
                }
                None => {
                    if position >= names.len() {
                        return Err(Error::invalid_effect(
                            effect,
                            format!("too many values in '{params}'"),
                        ));
                    }
                    values[position] = Some(token);
                    position
                }
            };
            if values[index].as_deref() == Some("") {
                return Err(Error::invalid_effect(
                    effect,
                    format!("option '{}' has no value", names[index][0]),
                ));
            }
        }

        Ok(Self {
            effect: effect.to_string(),
            names,
            values,
        })
    }

    pub fn effect(&self) -> &str {
        &self.effect
    }

    /**
        Raw value of an option, by canonical name.
    */
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|spellings| spellings[0] == name)?;
        self.values[index].as_deref()
    }

    /**
        A numeric option, or `default` when absent. Values outside
        `min..=max` are rejected.
    */
    pub fn number(&self, name: &str, default: f64, min: f64, max: f64) -> Result<f64> {
        let Some(raw) = self.get(name) else {
            return Ok(default);
        };
        let value = self.parse_number(name, raw)?;
        self.check_range(name, value, min, max)
    }

    /**
        A `|`-separated list of numbers.
    */
    pub fn numbers(&self, name: &str, default: &str, min: f64, max: f64) -> Result<Vec<f64>> {
        self.get(name)
            .unwrap_or(default)
            .split('|')
            .map(|raw| {
                let value = self.parse_number(name, raw)?;
                self.check_range(name, value, min, max)
            })
            .collect()
    }

    /**
        One of a fixed set of keywords.
    */
    pub fn choice<'a>(&self, name: &str, default: &'a str, allowed: &[&'a str]) -> Result<&'a str> {
        let Some(raw) = self.get(name) else {
            return Ok(default);
        };
        allowed.iter().copied().find(|c| *c == raw).ok_or_else(|| {
            Error::invalid_effect(
                &self.effect,
                format!("option '{name}' must be one of {}, got '{raw}'", allowed.join(", ")),
            )
        })
    }

    pub(crate) fn parse_number(&self, name: &str, raw: &str) -> Result<f64> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                Error::invalid_effect(
                    &self.effect,
                    format!("option '{name}' is not a number: '{raw}'"),
                )
            })
    }

    pub(crate) fn check_range(&self, name: &str, value: f64, min: f64, max: f64) -> Result<f64> {
        if (min..=max).contains(&value) {
            Ok(value)
        } else {
            Err(Error::invalid_effect(
                &self.effect,
                format!("option '{name}' = {value} out of range [{min}, {max}]"),
            ))
        }
    }
}

/**
    Split on `:`, honouring `\:` and `\\` escapes.
*/
fn split_unescaped(params: &str) -> Vec<String> {
    let params = params.trim();
    if params.is_empty() {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = params.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => current.extend(chars.next()),
            ':' => tokens.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECHO: &[&[&str]] = &[&["in_gain"], &["out_gain"], &["delays"], &["decays"]];
    const FILTER: &[&[&str]] = &[&["frequency", "f"], &["width", "w"]];

    #[test]
    fn positional_values_follow_declared_order() {
        let options = EffectOptions::parse("aecho", "0.8:0.9:1000|1800:0.3|0.25", ECHO).unwrap();
        assert_eq!(options.get("in_gain"), Some("0.8"));
        assert_eq!(options.numbers("delays", "1000", 0.0, 90000.0).unwrap(), vec![1000.0, 1800.0]);
    }

    #[test]
    fn named_values_and_aliases() {
        let options = EffectOptions::parse("lowpass", "w=2:f=1200", FILTER).unwrap();
        assert_eq!(options.number("frequency", 500.0, 0.0, 1e6).unwrap(), 1200.0);
        assert_eq!(options.number("width", 0.707, 0.0, 100.0).unwrap(), 2.0);
    }

    #[test]
    fn positional_then_named() {
        let options = EffectOptions::parse("lowpass", "800:width=3", FILTER).unwrap();
        assert_eq!(options.get("frequency"), Some("800"));
        assert_eq!(options.get("width"), Some("3"));
    }

    #[test]
    fn defaults_apply_when_absent() {
        let options = EffectOptions::parse("lowpass", "", FILTER).unwrap();
        assert_eq!(options.number("frequency", 500.0, 0.0, 1e6).unwrap(), 500.0);
    }

    #[test]
    fn escaped_colons_stay_in_values() {
        assert_eq!(split_unescaped(r"a=1\:2:b=3"), vec!["a=1:2", "b=3"]);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        for params in ["bogus=1", "1:2:3", "f=1:2", "f=", "f=abc", "1::2"] {
            let err = EffectOptions::parse("lowpass", params, FILTER)
                .and_then(|o| o.number("frequency", 0.0, 0.0, 1e6));
            assert!(matches!(err, Err(Error::InvalidEffect { .. })), "{params}");
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let options = EffectOptions::parse("lowpass", "f=-5", FILTER).unwrap();
        assert!(options.number("frequency", 500.0, 0.0, 1e6).is_err());
    }

    #[test]
    fn definition_from_command_line() {
        let def = EffectDefinition::parse("volume=volume=-6dB").unwrap();
        assert_eq!(def.name, "volume");
        assert_eq!(def.params, "volume=-6dB");
        assert_eq!(def.to_string(), "volume=volume=-6dB");
        assert_eq!(EffectDefinition::parse("negate").unwrap().params, "");
        assert!(EffectDefinition::parse("=x").is_err());
    }

    #[test]
    fn definition_from_json() {
        let json = r#"[{"name":"hflip"},{"name":"eq","params":"contrast=1.5"}]"#;
        let defs: Vec<EffectDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(defs[0], EffectDefinition::new("hflip", ""));
        assert_eq!(defs[1].params, "contrast=1.5");
    }
}
