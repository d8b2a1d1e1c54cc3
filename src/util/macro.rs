pub mod unwrap_helper {
    // inline return of a fallback value when an Option is empty
    macro_rules! return_default {
        ( $e:expr, $d:expr ) => {
            match $e {
                Some(x) => x,
                None => return ($d),
            }
        }
    }

    pub(crate) use return_default;
}
