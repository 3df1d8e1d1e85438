//! Drives the `SASL`/SCRAM-SHA-256 exchange (§4.4) once the server has offered it. The
//! cleartext and MD5 paths are single round trips and are driven directly from
//! `establish()`; SCRAM needs two, so it gets its own function.

use crate::connection::stream::PgStream;
use crate::error::{err_protocol, Error};
use crate::message::{Authentication, Backend, SaslInitialResponse, SaslResponse};
use crate::scram::{self, ScramSha256};

pub(crate) async fn authenticate_sasl(
    stream: &mut PgStream,
    password: &str,
    mechanisms: &[String],
) -> crate::Result<()> {
    if !scram::supports(mechanisms) {
        return Err(Error::Authentication(format!(
            "server does not offer a supported SASL mechanism (offered: {mechanisms:?})"
        )));
    }

    let mut client = ScramSha256::new();

    stream
        .send(SaslInitialResponse {
            mechanism: scram::mechanism(),
            data: &client.client_first_message(),
        })
        .await?;

    let server_first = match stream.recv().await? {
        Backend::Authentication(Authentication::SaslContinue { data }) => data,
        other => return Err(err_protocol!("expected AuthenticationSASLContinue, got {other:?}")),
    };
    let server_first = String::from_utf8(server_first)
        .map_err(|_| err_protocol!("AuthenticationSASLContinue payload was not valid UTF-8"))?;

    let client_final = client.process_server_first(password, &server_first)?;
    stream.send(SaslResponse(&client_final)).await?;

    let server_final = match stream.recv().await? {
        Backend::Authentication(Authentication::SaslFinal { data }) => data,
        other => return Err(err_protocol!("expected AuthenticationSASLFinal, got {other:?}")),
    };
    let server_final = String::from_utf8(server_final)
        .map_err(|_| err_protocol!("AuthenticationSASLFinal payload was not valid UTF-8"))?;

    client.verify_server_final(&server_final)?;

    // The server still owes us a final plain `AuthenticationOk` once it has verified our proof.
    match stream.recv().await? {
        Backend::Authentication(Authentication::Ok) => Ok(()),
        other => Err(err_protocol!("expected AuthenticationOk after SASL exchange, got {other:?}")),
    }
}
