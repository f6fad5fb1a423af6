//! Startup parameters. Read once, then frozen.
//!
//! Later sources win: built-in defaults, then `NULLL_CAPACITY`, then
//! `key=value` arguments (`capacity=1024 name=nulll`), the same shape as
//! module parameters.
use std::env;

use derive_more::Display;

pub const DEFAULT_NAME: &str = "nulll";
pub const CAPACITY_ENV: &str = "NULLL_CAPACITY";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
	/// Capacity in bytes, 0 for no limit.
	pub capacity: u64,
	/// Name the device is registered under.
	pub name: String,
}

impl Default for Config {
	fn default() -> Self {
		Self { capacity: 0, name: DEFAULT_NAME.to_owned() }
	}
}

#[derive(Debug, Display, PartialEq)]
pub enum ConfigErr {
	#[display(fmt = "expected key=value, got {:?}", _0)]
	Malformed(String),
	#[display(fmt = "unknown parameter {:?}", _0)]
	UnknownKey(String),
	#[display(fmt = "capacity must be a number of bytes, got {:?}", _0)]
	BadCapacity(String),
	#[display(fmt = "device name must not be empty")]
	EmptyName,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigErr> {
		Self::load(env::var(CAPACITY_ENV).ok(), env::args().skip(1))
	}

	pub fn load<I, S>(env_capacity: Option<String>, args: I) -> Result<Self, ConfigErr>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut config = Self::default();

		if let Some(value) = env_capacity {
			config.set("capacity", &value)?;
		}

		for arg in args {
			let arg = arg.as_ref();
			let (key, value) = arg
				.split_once('=')
				.ok_or_else(|| ConfigErr::Malformed(arg.to_owned()))?;
			config.set(key.trim(), value.trim())?;
		}

		Ok(config)
	}

	fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigErr> {
		match key {
			"capacity" => self.capacity = parse_capacity(value)?,
			"name" if value.is_empty() => return Err(ConfigErr::EmptyName),
			"name" => self.name = value.to_owned(),
			_ => return Err(ConfigErr::UnknownKey(key.to_owned())),
		}
		Ok(())
	}
}

/// Unsigned, with `0x` for hex and a leading `0` for octal, like `kstrtoul`.
fn parse_capacity(value: &str) -> Result<u64, ConfigErr> {
	let bad = || ConfigErr::BadCapacity(value.to_owned());
	let parsed = if let Some(hex) =
		value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))
	{
		u64::from_str_radix(hex, 16)
	} else if value.len() > 1 && value.starts_with('0') {
		u64::from_str_radix(&value[1..], 8)
	} else {
		value.parse()
	};
	parsed.map_err(|_| bad())
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	const NO_ARGS: [&str; 0] = [];

	#[test]
	fn defaults_to_unlimited() {
		let config = Config::load(None, NO_ARGS).unwrap();
		assert_eq!(config, Config { capacity: 0, name: "nulll".into() });
	}

	#[test]
	fn arguments_override_environment() {
		let config = Config::load(Some("100".into()), NO_ARGS).unwrap();
		assert_eq!(config.capacity, 100);

		let config =
			Config::load(Some("100".into()), ["capacity=0x20", "name=sink0"])
				.unwrap();
		assert_eq!(config.capacity, 32);
		assert_eq!(config.name, "sink0");
	}

	#[test]
	fn capacity_accepts_kernel_number_forms() {
		assert_eq!(parse_capacity("0"), Ok(0));
		assert_eq!(parse_capacity("4096"), Ok(4096));
		assert_eq!(parse_capacity("0X1f"), Ok(31));
		assert_eq!(parse_capacity("017"), Ok(15));
		assert_eq!(parse_capacity("-1"), Err(ConfigErr::BadCapacity("-1".into())));
		assert_eq!(parse_capacity("08"), Err(ConfigErr::BadCapacity("08".into())));
		assert_eq!(parse_capacity(""), Err(ConfigErr::BadCapacity("".into())));
	}

	#[test]
	fn rejects_bad_parameters() {
		assert_eq!(
			Config::load(None, ["capacity"]),
			Err(ConfigErr::Malformed("capacity".into()))
		);
		assert_eq!(
			Config::load(None, ["size=10"]),
			Err(ConfigErr::UnknownKey("size".into()))
		);
		assert_eq!(Config::load(None, ["name="]), Err(ConfigErr::EmptyName));
		assert_eq!(
			Config::load(Some("lots".into()), NO_ARGS),
			Err(ConfigErr::BadCapacity("lots".into()))
		);
	}
}
