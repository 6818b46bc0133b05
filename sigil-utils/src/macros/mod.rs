//! hidden sigil macros

#[doc(hidden)]
pub use paste::paste;

#[doc(hidden)]
#[macro_export]
macro_rules! __match_ignore_ascii_case_str {
    (match ($s:expr) { $caseA:literal $(| $caseAVar:literal)* $(if $condA:expr)? => $retA:expr $(, $caseB:literal $(| $caseBVar:literal)* $(if $condB:expr)? => $retB:expr)*, _ => $fallback:expr $(,)? }) => {
        {
            let s = ($s).trim();
            if $($condA &&)? (s.eq_ignore_ascii_case($caseA) $(|| s.eq_ignore_ascii_case($caseAVar))*) {
                $retA
            }
            $(
                else if $($condB &&)? (s.eq_ignore_ascii_case($caseB) $(|| s.eq_ignore_ascii_case($caseBVar))*) {
                    $retB
                }
            )*
            else {
                $fallback
            }
        }
    };
}
#[doc(inline)]
pub use crate::__match_ignore_ascii_case_str as match_ignore_ascii_case_str;

#[doc(hidden)]
#[macro_export]
macro_rules! __generate_set_and_with {
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $param_name:ident: Option<$param_ty:ty> $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<maybe_with_ $fn_name>](mut $self_token, $param_name: Option<$param_ty>) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<maybe_set_ $fn_name>](&mut $self_token, $param_name: Option<$param_ty>) -> &mut Self {
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $param_name: $param_ty) -> Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $param_name: $param_ty) -> &mut Self {
                let $param_name: Option<$param_ty> = Some($param_name);
                $($body)*
            }

            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<without_ $fn_name>](mut $self_token) -> Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<unset_ $fn_name>](&mut $self_token) -> &mut Self {
                let $param_name: Option<$param_ty> = None;
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Self {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            #[must_use]
            $vis fn [<with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Self {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> &mut Self {
                $($body)*
            }
        }
    };
    (
        $(#[$outer_doc:meta])*
        $vis:vis fn $fn_name:ident(mut $self_token:ident, $($param_name:ident: $param_ty:ty),+ $(,)?) -> Result<Self, $error:ty> {
            $($body:tt)*
        }
    ) => {
        $crate::macros::paste! {
            $(#[$outer_doc])*
            $vis fn [<try_with_ $fn_name>](mut $self_token, $($param_name: $param_ty),+) -> Result<Self, $error> {
                $($body)*
            }

            $(#[$outer_doc])*
            $vis fn [<try_set_ $fn_name>](&mut $self_token, $($param_name: $param_ty),+) -> Result<&mut Self, $error> {
                $($body)*
            }
        }
    };
}
#[doc(inline)]
pub use crate::__generate_set_and_with as generate_set_and_with;

#[cfg(test)]
mod tests {
    use super::*;

    fn curve_bits(crv: &str) -> Option<usize> {
        match_ignore_ascii_case_str!(match (crv) {
            "P-256" | "secp256r1" => Some(256),
            "secp256k1" => Some(256),
            "P-384" if crv.len() == 5 => Some(384),
            _ => None,
        })
    }

    #[test]
    fn match_ignore_ascii_case_str_matches_variants() {
        assert_eq!(curve_bits("P-256"), Some(256));
        assert_eq!(curve_bits("p-256"), Some(256));
        assert_eq!(curve_bits(" SECP256R1 "), Some(256));
        assert_eq!(curve_bits("SecP256K1"), Some(256));
        assert_eq!(curve_bits("p-384"), Some(384));
        assert_eq!(curve_bits("Ed25519"), None);
    }

    #[derive(Debug, Default)]
    struct RecipientOptions {
        kid: Option<String>,
        key_ops: Vec<String>,
        iv: Vec<u8>,
    }

    impl RecipientOptions {
        generate_set_and_with! {
            /// kid to put in the recipient header
            fn kid(mut self, kid: Option<String>) -> Self {
                self.kid = kid;
                self
            }
        }

        generate_set_and_with! {
            /// allowed key operation
            fn key_op(mut self, op: impl Into<String>) -> Self {
                self.key_ops.push(op.into());
                self
            }
        }

        generate_set_and_with! {
            /// explicit initialization vector
            fn iv(mut self, iv: &[u8]) -> Result<Self, String> {
                if iv.len() != 12 {
                    return Err(format!("iv must be 12 bytes, got {}", iv.len()));
                }
                self.iv = iv.to_vec();
                Ok(self)
            }
        }
    }

    #[test]
    fn generate_set_and_with_option_variants() {
        let opts = RecipientOptions::default().with_kid("k1".to_owned());
        assert_eq!(opts.kid.as_deref(), Some("k1"));

        let opts = opts.without_kid();
        assert!(opts.kid.is_none());

        let mut opts = opts.maybe_with_kid(Some("k2".to_owned()));
        assert_eq!(opts.kid.as_deref(), Some("k2"));

        opts.unset_kid();
        assert!(opts.kid.is_none());

        opts.set_kid("k3".to_owned()).maybe_set_kid(None);
        assert!(opts.kid.is_none());
    }

    #[test]
    fn generate_set_and_with_plain_and_try_variants() {
        let mut opts = RecipientOptions::default()
            .with_key_op("wrapKey")
            .try_with_iv(&[0; 12])
            .unwrap();
        opts.set_key_op("unwrapKey");

        assert_eq!(opts.key_ops, vec!["wrapKey", "unwrapKey"]);
        assert_eq!(opts.iv.len(), 12);

        let err = opts.try_set_iv(&[1; 16]).unwrap_err();
        assert_eq!(err, "iv must be 12 bytes, got 16");
        assert_eq!(opts.iv, vec![0; 12]);
    }
}
