//! Macro for implementing Display and FromStr for unit enums
//!
//! Field names, notice levels and backend kinds all travel as plain strings
//! (form inputs, config values, log fields). This macro gives each of them a
//! single mapping for both directions with case-insensitive parsing.
//!
//! # Example
//!
//! ```rust
//! use dealdesk_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum DealOutcome {
//!     Open,
//!     Won,
//!     Lost,
//! }
//!
//! impl_domain_status_conversions!(DealOutcome {
//!     Open => "open",
//!     Won => "won",
//!     Lost => "lost",
//! });
//!
//! assert_eq!("WON".parse::<DealOutcome>().unwrap(), DealOutcome::Won);
//! ```

/// Implements Display and FromStr traits for unit enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations (must be lowercase)
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
