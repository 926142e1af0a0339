pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidFormat {
        element: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn checked_div(a: u32, b: u32) -> super::Result<u32> {
        verify_arg!(b, b != 0);
        Ok(a / b)
    }

    fn checked_magic(magic: &[u8]) -> super::Result<()> {
        verify_data!(magic, magic == b"MTXS");
        Ok(())
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(checked_div(6, 3).unwrap(), 2);
        let e = checked_div(1, 0).unwrap_err();
        match e.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "b");
                assert_eq!(message, "b != 0");
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(checked_magic(b"MTXS").is_ok());
        assert!(matches!(
            checked_magic(b"XXXX").unwrap_err().kind(),
            ErrorKind::InvalidFormat { .. }
        ));
    }
}
