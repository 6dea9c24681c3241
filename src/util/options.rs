use std::default::Default;

/// The default worklist compaction threshold of the reference walker. Once this many
/// worklist entries have been consumed, the consumed prefix is erased.
pub const DEFAULT_WORKLIST_COMPACTION_THRESHOLD: usize = 1_000_000;

/// The prefix of environment variables that set heapti options, e.g. `HEAPTI_REPORT_BUFFER_LIMIT`.
pub const ENV_VAR_PREFIX: &str = "HEAPTI_";

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Runtime options of a heapti instance.
        #[derive(Clone, Debug)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Set an option from its name and a string value. Returns false if the
            /// value cannot be parsed or is rejected by the option's validator, in
            /// which case the option keeps its current value.
            ///
            /// Panics if `s` is not the name of an option.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling set_option()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => panic!("Invalid Options key: {}", s)
                }
            }

            /// Is `s` the name of an option?
            pub fn is_option(s: &str) -> bool {
                matches!(s, $(stringify!($name))|*)
            }

            /// Options with their default values, ignoring environment variables.
            pub fn without_env_vars() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Override options from environment variables that start with
            /// [`ENV_VAR_PREFIX`] and match an option (such as `HEAPTI_REPORT_BUFFER_LIMIT`).
            /// Invalid values are ignored.
            pub fn read_env_var_settings(&mut self) {
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(ENV_VAR_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { self.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::without_env_vars();
                options.read_env_var_settings();
                options
            }
        }
    ]
}

options! {
    // Number of consumed worklist entries after which the reference walker erases the consumed prefix.
    worklist_compaction_threshold: usize [|v: &usize| *v > 0] = DEFAULT_WORKLIST_COMPACTION_THRESHOLD,
    // The largest scratch buffer (in bytes) a reporter may allocate to copy a string or an array.
    // A larger request is treated like a failed allocation: it is logged and the value is skipped.
    report_buffer_limit:           usize [|v: &usize| *v > 0] = usize::MAX,
    // Cache the number of interface static fields per class.
    cache_interface_field_counts:  bool  [always_valid]       = true,
}

fn always_valid<T>(_: &T) -> bool {
    true
}
