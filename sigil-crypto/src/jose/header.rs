use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sigil_error::{ErrorContext, OpaqueError};
use sigil_utils::macros::generate_set_and_with;

use crate::jose::b64;

#[derive(Default, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// [`Header`] holds the JOSE header parameters of a signature or recipient,
/// either protected (covered by the signature or AEAD tag) or unprotected.
///
/// Registered parameters are typed fields, serialized in a fixed order, any
/// other parameter lives in an (ordered) map of extra parameters. A parameter
/// that is present with an empty string value is "declared but empty",
/// which the token engines fill in from the key used to sign or encrypt.
pub struct Header {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crit: Option<Vec<String>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Registered header parameters which the token engines fill in
pub(crate) enum HeaderField {
    Alg,
    Enc,
    Kid,
}

impl Header {
    /// Create an empty [`Header`]
    pub fn new() -> Self {
        Self::default()
    }

    generate_set_and_with! {
        /// Algorithm used to sign or to wrap the content encryption key,
        /// use an empty string to have it filled in
        pub fn alg(mut self, alg: Option<String>) -> Self {
            self.alg = alg;
            self
        }
    }

    generate_set_and_with! {
        /// Content encryption algorithm
        pub fn enc(mut self, enc: Option<String>) -> Self {
            self.enc = enc;
            self
        }
    }

    generate_set_and_with! {
        /// Key id, use an empty string to have it filled in
        pub fn kid(mut self, kid: Option<String>) -> Self {
            self.kid = kid;
            self
        }
    }

    generate_set_and_with! {
        /// Media type of the complete token
        pub fn typ(mut self, typ: Option<String>) -> Self {
            self.typ = typ;
            self
        }
    }

    generate_set_and_with! {
        /// Media type of the payload
        pub fn cty(mut self, cty: Option<String>) -> Self {
            self.cty = cty;
            self
        }
    }

    generate_set_and_with! {
        /// Set any header parameter, registered or not
        ///
        /// Warning: this function will replace an already existing value
        pub fn parameter(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self, OpaqueError> {
            let name = name.into();
            let value = serde_json::to_value(value).context("convert header value")?;
            let slot = match name.as_str() {
                "alg" => &mut self.alg,
                "enc" => &mut self.enc,
                "kid" => &mut self.kid,
                "typ" => &mut self.typ,
                "cty" => &mut self.cty,
                "crit" => {
                    self.crit = Some(
                        serde_json::from_value(value).context("crit must be an array of strings")?,
                    );
                    return Ok(self);
                }
                _ => {
                    self.extra.insert(name, value);
                    return Ok(self);
                }
            };
            match value {
                Value::String(value) => *slot = Some(value),
                _ => Err(OpaqueError::from_display(format!("header parameter '{name}' must be a string")))?,
            }
            Ok(self)
        }
    }

    /// Algorithm, if declared and not empty
    pub fn alg(&self) -> Option<&str> {
        non_empty(self.alg.as_ref())
    }

    /// Content encryption algorithm, if declared and not empty
    pub fn enc(&self) -> Option<&str> {
        non_empty(self.enc.as_ref())
    }

    /// Key id, if declared and not empty
    pub fn kid(&self) -> Option<&str> {
        non_empty(self.kid.as_ref())
    }

    pub fn typ(&self) -> Option<&str> {
        non_empty(self.typ.as_ref())
    }

    pub fn cty(&self) -> Option<&str> {
        non_empty(self.cty.as_ref())
    }

    /// Names of the parameters which a consumer must understand
    pub fn crit(&self) -> Option<&[String]> {
        self.crit.as_deref()
    }

    /// Look up any parameter by name
    pub fn get(&self, name: &str) -> Option<Value> {
        let registered = match name {
            "alg" => &self.alg,
            "enc" => &self.enc,
            "kid" => &self.kid,
            "typ" => &self.typ,
            "cty" => &self.cty,
            "crit" => return self.crit.as_ref().map(|crit| Value::from(crit.clone())),
            _ => return self.extra.get(name).cloned(),
        };
        registered.clone().map(Value::String)
    }

    /// Returns true if at least one parameter is present,
    /// headers without elements are never emitted
    pub fn has_elements(&self) -> bool {
        self.alg.is_some()
            || self.enc.is_some()
            || self.kid.is_some()
            || self.typ.is_some()
            || self.cty.is_some()
            || self.crit.is_some()
            || !self.extra.is_empty()
    }

    /// Overwrite parameters in this header with all parameters present in `other`
    pub fn merge(&mut self, other: &Self) {
        for (dst, src) in [
            (&mut self.alg, &other.alg),
            (&mut self.enc, &other.enc),
            (&mut self.kid, &other.kid),
            (&mut self.typ, &other.typ),
            (&mut self.cty, &other.cty),
        ] {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        if other.crit.is_some() {
            self.crit.clone_from(&other.crit);
        }
        self.extra
            .extend(other.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Canonical encoding: `BASE64URL(UTF8(JSON(header)))`, or the empty
    /// string if this header has no elements
    pub fn encode(&self) -> Result<String, OpaqueError> {
        if !self.has_elements() {
            return Ok(String::new());
        }
        let json = serde_json::to_vec(self).context("serialize header")?;
        Ok(b64::encode(json))
    }

    /// Decode a header from its base64url encoded form,
    /// the empty string decodes to an empty header
    pub fn decode(encoded: &str) -> Result<Self, OpaqueError> {
        if encoded.is_empty() {
            return Ok(Self::default());
        }
        let json = b64::decode(encoded).context("base64url decode header")?;
        serde_json::from_slice(&json).context("parse header json object")
    }

    fn field_mut(&mut self, field: HeaderField) -> &mut Option<String> {
        match field {
            HeaderField::Alg => &mut self.alg,
            HeaderField::Enc => &mut self.enc,
            HeaderField::Kid => &mut self.kid,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Fill in a header parameter from the key (or algorithm) in use.
///
/// Declared-but-empty values are filled in, wherever they are declared. If the
/// parameter is absent from all headers it is added to `target`. Values that are
/// already set are never overwritten. Without a value to fill in, empty
/// declarations are dropped.
pub(crate) fn fill_parameter(
    field: HeaderField,
    value: Option<&str>,
    target: &mut Header,
    others: &mut [&mut Header],
) {
    let mut absent = target.field_mut(field).is_none();
    fill_slot(target.field_mut(field), value);
    for header in others.iter_mut() {
        let slot = header.field_mut(field);
        absent &= slot.is_none();
        fill_slot(slot, value);
    }

    if absent && let Some(value) = value {
        *target.field_mut(field) = Some(value.to_owned());
    }
}

fn fill_slot(slot: &mut Option<String>, value: Option<&str>) {
    if slot.as_deref() == Some("") {
        *slot = value.map(ToOwned::to_owned);
    }
}
