use md5::{Digest, Md5};

use crate::io::{Buf, BufMut, Encode};

/// Backend `AuthenticationXxx` replies. Kerberos/SCM/GSSAPI/SSPI are parsed (so the connection
/// can report a clear "unsupported authentication method" error) but never implemented — they
/// have no bearing on a modern password/SCRAM deployment.
#[derive(Debug)]
pub(crate) enum Authentication {
    Ok,
    KerberosV5,
    CleartextPassword,
    Md5Password { salt: [u8; 4] },
    ScmCredential,
    Gss,
    Sspi,
    GssContinue,
    Sasl { mechanisms: Vec<String> },
    SaslContinue { data: Vec<u8> },
    SaslFinal { data: Vec<u8> },
}

impl Authentication {
    pub(crate) fn decode(mut buf: &[u8]) -> crate::Result<Self> {
        Ok(match buf.get_u32()? {
            0 => Authentication::Ok,
            2 => Authentication::KerberosV5,
            3 => Authentication::CleartextPassword,
            5 => {
                let mut salt = [0u8; 4];
                salt.copy_from_slice(buf.get_bytes(4)?);
                Authentication::Md5Password { salt }
            }
            6 => Authentication::ScmCredential,
            7 => Authentication::Gss,
            8 => Authentication::GssContinue,
            9 => Authentication::Sspi,
            10 => {
                let mut mechanisms = Vec::new();
                while !buf.is_empty() && buf[0] != 0 {
                    mechanisms.push(buf.get_str_nul()?.to_owned());
                }
                Authentication::Sasl { mechanisms }
            }
            11 => Authentication::SaslContinue {
                data: buf.to_vec(),
            },
            12 => Authentication::SaslFinal {
                data: buf.to_vec(),
            },
            other => {
                return Err(crate::error::err_protocol!(
                    "unknown authentication message subtype: {other}"
                ));
            }
        })
    }
}

/// Frontend `PasswordMessage`/`SASLInitialResponse`/`SASLResponse` — all tagged `p` on the wire,
/// distinguished only by the server's prior request.
pub(crate) enum Password<'a> {
    Cleartext(&'a str),
    Md5 {
        username: &'a str,
        password: &'a str,
        salt: [u8; 4],
    },
}

impl Encode for Password<'_> {
    fn tag(&self) -> Option<u8> {
        Some(b'p')
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Password::Cleartext(password) => buf.put_str_nul(password),
            Password::Md5 {
                username,
                password,
                salt,
            } => {
                let mut hasher = Md5::new();
                hasher.update(password.as_bytes());
                hasher.update(username.as_bytes());
                let inner = format!("{:x}", hasher.finalize_reset());

                hasher.update(inner.as_bytes());
                hasher.update(salt);
                let outer = format!("{:x}", hasher.finalize());

                buf.put_str_nul(&format!("md5{outer}"));
            }
        }
    }
}
