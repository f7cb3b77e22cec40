use crate::codec::{AmiAction, AmiCodec, AmiFrame};
use crate::{CONNECT_TIMEOUT, LOGIN_TIMEOUT, LOGOFF_TIMEOUT};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use gsmgw_core::config::AmiConfig;
use gsmgw_core::{AppError, AppResult};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BANNER_PREFIX: &str = "Asterisk Call Manager";

pub type AmiWriter = SplitSink<Framed<TcpStream, AmiCodec>, AmiAction>;
pub type AmiReader = SplitStream<Framed<TcpStream, AmiCodec>>;

/// An authenticated-or-about-to-be manager session
pub struct AmiConnection {
    framed: Framed<TcpStream, AmiCodec>,
    server_id: String,
}

impl AmiConnection {
    /// Dial the switch and read its banner, bounded by [`CONNECT_TIMEOUT`]
    pub async fn connect(config: &AmiConfig) -> AppResult<Self> {
        let server_id = config.server_id();
        let address = config.address();
        info!("Connecting to AMI: {}", address);

        let dial = async {
            let stream = TcpStream::connect(&address).await.map_err(|e| {
                AppError::AmiConnection(format!("dial {} failed: {}", address, e))
            })?;
            let mut framed = Framed::new(stream, AmiCodec::new());

            match framed.next().await {
                Some(Ok(AmiFrame::Banner(banner))) if banner.starts_with(BANNER_PREFIX) => {
                    Ok((framed, banner))
                }
                Some(Ok(AmiFrame::Banner(banner))) => Err(AppError::AmiProtocol(format!(
                    "unexpected greeting: {}",
                    banner
                ))),
                Some(Ok(other)) => Err(AppError::AmiProtocol(format!(
                    "expected greeting, got {:?}",
                    other
                ))),
                Some(Err(e)) => Err(e),
                None => Err(AppError::AmiConnection(
                    "connection closed before greeting".to_string(),
                )),
            }
        };

        let (framed, banner) = timeout(CONNECT_TIMEOUT, dial)
            .await
            .map_err(|_| AppError::Timeout(format!("connecting to {}", address)))??;

        debug!("Received greeting from {}: {}", server_id, banner);

        Ok(Self { framed, server_id })
    }

    /// Send `Action: Login` and wait for its reply, bounded by [`LOGIN_TIMEOUT`].
    ///
    /// Any reply other than `Response: Success` is an authentication
    /// failure. Events that slip in before the reply are discarded.
    pub async fn login(&mut self, username: &str, secret: &str) -> AppResult<()> {
        let action_id = Uuid::new_v4().to_string();
        self.framed
            .send(AmiAction::login(username, secret, &action_id))
            .await?;

        let reply = timeout(LOGIN_TIMEOUT, async {
            loop {
                match self.framed.next().await {
                    Some(Ok(AmiFrame::Response(reply))) => {
                        if reply.action_id().map_or(true, |id| id == action_id) {
                            return Ok(reply);
                        }
                        debug!("Skipping reply to another action while logging in");
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(AppError::AmiConnection(
                            "connection closed during login".to_string(),
                        ))
                    }
                }
            }
        })
        .await
        .map_err(|_| AppError::Timeout(format!("login to {}", self.server_id)))??;

        match reply.response() {
            Some(status) if status.eq_ignore_ascii_case("Success") => {
                info!("✅ Authenticated to AMI: {}", self.server_id);
                Ok(())
            }
            _ => Err(AppError::AmiAuthentication(
                reply
                    .field("Message")
                    .unwrap_or("login rejected")
                    .to_string(),
            )),
        }
    }

    /// Hand the session over to a writer half and a frame stream
    pub fn split(self) -> (AmiWriter, AmiReader) {
        self.framed.split()
    }
}

/// Best-effort `Action: Logoff`, bounded by [`LOGOFF_TIMEOUT`]
pub async fn logoff(writer: &mut AmiWriter, server_id: &str) {
    let action = AmiAction::logoff(&Uuid::new_v4().to_string());
    match timeout(LOGOFF_TIMEOUT, writer.send(action)).await {
        Ok(Ok(())) => debug!("Sent logoff to {}", server_id),
        Ok(Err(e)) => warn!("Logoff to {} failed: {}", server_id, e),
        Err(_) => warn!("Logoff to {} timed out", server_id),
    }
}
