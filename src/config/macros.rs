/// Configuration macros for zero-repetition config definitions

/// Define a configuration struct with embedded defaults
///
/// Each field is declared as `name: Type = default` and the macro generates
/// the struct with public fields, a `Default` impl using those values, and
/// serde support with `#[serde(default)]` so partial TOML files load.
///
/// # Example
/// ```
/// launchsniper::config_struct! {
///     pub struct ExampleConfig {
///         stop_loss_pct: f64 = -30.0,
///         enabled: bool = true,
///     }
/// }
///
/// assert_eq!(ExampleConfig::default().stop_loss_pct, -30.0);
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
