//! Helper macro for port error enums.
//!
//! Each variant names the domain [`ErrorCode`](crate::domain::ErrorCode)
//! constructor it maps to, so services can use `?` on port results and get a
//! correctly classified [`Error`](crate::domain::Error).

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };

    (@pattern $name:ident $variant:ident) => { $name::$variant };
    (@pattern $name:ident $variant:ident { $($field:ident : $ty:ty),* }) => { $name::$variant { .. } };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $code:ident, $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }

        impl From<$name> for $crate::domain::Error {
            fn from(err: $name) -> Self {
                let message = err.to_string();
                match err {
                    $(
                        define_port_error!(@pattern $name $variant $( { $($field : $ty),* } )?) => {
                            $crate::domain::Error::$code(message)
                        }
                    )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use crate::domain::ErrorCode;

    define_port_error! {
        pub enum ExamplePortError {
            Offline => service_unavailable, "store offline",
            Query { message: String } => internal, "query failed: {message}",
            Missing { key: String, attempts: u32 } => not_found, "missing {key} after {attempts}",
        }
    }

    #[test]
    fn constructors_accept_str_for_string_fields() {
        let err = ExamplePortError::query("boom");
        assert_eq!(err.to_string(), "query failed: boom");
    }

    #[test]
    fn constructors_support_mixed_fields() {
        let err = ExamplePortError::missing("photo", 3_u32);
        assert_eq!(err.to_string(), "missing photo after 3");
    }

    #[test]
    fn converts_into_classified_domain_errors() {
        let offline: crate::domain::Error = ExamplePortError::offline().into();
        assert_eq!(offline.code(), ErrorCode::ServiceUnavailable);
        let missing: crate::domain::Error = ExamplePortError::missing("k", 1_u32).into();
        assert_eq!(missing.code(), ErrorCode::NotFound);
        assert_eq!(missing.message(), "missing k after 1");
    }
}
