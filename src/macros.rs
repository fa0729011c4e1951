// auto-implement Default, TryFrom<u16> and FromStr for #[repr(u16)] wire enums
#[macro_export]
macro_rules! derive_enum {
    ($t:ty, [$first:ident $(, $rest:ident)* $(,)?]) => {
        impl Default for $t {
            fn default() -> Self {
                <$t>::$first
            }
        }

        impl TryFrom<u16> for $t {
            type Error = String;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    x if x == <$t>::$first as u16 => Ok(<$t>::$first),
                    $(x if x == <$t>::$rest as u16 => Ok(<$t>::$rest),)*
                    _ => Err(format!("{} is not a valid {} value", value, stringify!($t))),
                }
            }
        }

        impl std::str::FromStr for $t {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    x if x == stringify!($first) => Ok(<$t>::$first),
                    $(x if x == stringify!($rest) => Ok(<$t>::$rest),)*
                    _ => Err(format!("{} is not a valid {} value", s, stringify!($t))),
                }
            }
        }
    };
}

// render a byte buffer for debug logs, either as hex ("X") or as chars ("C")
#[macro_export]
macro_rules! format_buffer {
    ("X", $buf:expr) => {
        $buf.iter()
            .map(|x| format!("{:02X} ", x))
            .collect::<String>()
    };
    ("C", $buf:expr) => {
        $buf.iter()
            .map(|x| {
                if x.is_ascii_graphic() {
                    format!("{} ", *x as char)
                } else {
                    String::from(". ")
                }
            })
            .collect::<String>()
    };
}

// useful helpers for tests
#[macro_export]
macro_rules! test_from_network {
    ($slice:ident, $t:ty) => {{
        let s = crate::util::get_sample_slice($slice);
        let mut buffer = std::io::Cursor::new(s.as_slice());
        let mut v = <$t>::default();
        assert!(v.from_network_bytes(&mut buffer).is_ok());
        v
    }};
}

#[macro_export]
macro_rules! test_to_network {
    ($data:ident) => {{
        let mut buffer: Vec<u8> = Vec::new();
        let bytes_written = $data.to_network_bytes(&mut buffer).unwrap();

        (buffer, bytes_written)
    }};
}
