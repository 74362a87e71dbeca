// Declarative UCI option table. One invocation generates the option
// enum, the name/value parser and the `option name ...` printer from a
// single list of definitions.

macro_rules! uci_options {
    [$($name:ident ( $($def:tt)* )),* $(,)?] => {
        pub enum UciOption {
            $($name ( option_value_type!( $($def)* ) )),*
        }

        impl UciOption {
            pub fn parse(name: &str, value: &str) -> Result<Self, UciParseError> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($name)) {
                        return match OPTION_TABLE.$name.validate(value) {
                            Ok(v) => Ok(UciOption::$name(v)),
                            Err(e) => Err(UciParseError::Other(format!(
                                concat!(
                                    "Invalid value for ",
                                    stringify!($name),
                                    " in UCI setoption command: {}\n\t{}"
                                ),
                                value, e
                            ))),
                        };
                    }
                )*
                Err(UciParseError::Other(format!("Unknown option: {name}")))
            }
        }

        #[allow(non_snake_case)]
        struct OptionTable {
            $($name: option_field_type!( $($def)* )),*
        }

        const OPTION_TABLE: OptionTable = OptionTable {
            $($name: option_initializer!( $($def)* )),*
        };

        pub fn print_uci_options() {
            $(
                println!(
                    "option name {} {}",
                    stringify!($name),
                    OPTION_TABLE.$name.details()
                );
            )*
        }
    };
}

macro_rules! option_value_type {
    ($kind:ident $init:tt) => { <$kind as ValidateOption>::Output };
    ($kind:ident < $value:ty > $init:tt) => { $value };
}

macro_rules! option_field_type {
    ($kind:ident $init:tt) => { $kind };
    ($kind:ident < $value:ty > $init:tt) => { $kind<$value> };
}

macro_rules! option_initializer {
    ($kind:ident $init:tt) => { $kind $init };
    ($kind:ident < $value:ty > $init:tt) => { $kind $init };
}
