//! IKE_SA_INIT initiator state machine.
//!
//! ```text
//! Idle ──send──> AwaitingResponse ──CERTREQ──> ReceivedSaInitResponse ──> KeysDerived
//!                   ▲        │
//!                   │      COOKIE
//!                   │        ▼
//!                   └─send── ReceivedCookieChallenge
//! ```
//!
//! Every state is a value handed back by [`Handshake::step`]; any error ends
//! the exchange in [`HandshakeState::Failed`].

use crate::config::HandshakeConfig;
use crate::logging;
use crate::nat::{NatDetection, NatStatus};
use crate::transport::Transport;

use ikev2::entropy::EntropySource;
use ikev2::error::{Error, ErrorKind, Result};
use ikev2_keys::{KeyMaterial, KeyPair, KeySizes};
use ikev2_wire::{
    EncryptionAlgorithm, ExchangeType, Header, IkeFlags, IkePacket, KeyExchange, MessageType,
    Notify, Payload, PayloadType, PrfAlgorithm,
};

use std::net::SocketAddr;

/// Per-attempt secrets and identifiers, kept across cookie round trips.
#[derive(Debug)]
pub struct Session {
    pub initiator_spi: u64,
    pub nonce: Vec<u8>,
    key_pair: KeyPair,
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    nat: NatDetection,
}

impl Session {
    pub fn new<E: EntropySource + ?Sized>(
        config: &HandshakeConfig,
        entropy: &E,
        local_addr: SocketAddr,
        peer_addr: SocketAddr,
    ) -> Result<Self> {
        let mut spi = [0u8; 8];
        entropy.fill(&mut spi)?;
        let initiator_spi = u64::from_be_bytes(spi);
        let nonce = entropy.random_bytes(config.nonce_len)?;
        let key_pair = KeyPair::generate(config.dh_group, entropy)?;

        Ok(Self {
            initiator_spi,
            nonce,
            key_pair,
            local_addr,
            peer_addr,
            nat: NatDetection::for_request(initiator_spi, local_addr, peer_addr),
        })
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// The IKE_SA_INIT request for this session, echoing `cookie` last when
    /// the responder asked for one.
    pub fn request(&self, config: &HandshakeConfig, cookie: Option<&[u8]>) -> IkePacket {
        let mut payloads = vec![
            Payload::SecurityAssociation(vec![config.proposal()]),
            Payload::KeyExchange(KeyExchange {
                group: self.key_pair.group(),
                public_value: self.key_pair.public_value().clone(),
            }),
            Payload::Nonce(self.nonce.clone()),
            Payload::Notify(Notify::redirect_supported()),
            Payload::Notify(Notify::nat_detection_source(self.nat.source.to_vec())),
            Payload::Notify(Notify::nat_detection_destination(
                self.nat.destination.to_vec(),
            )),
            Payload::Notify(Notify::fragmentation_supported()),
        ];
        if let Some(cookie) = cookie {
            payloads.push(Payload::Notify(Notify::cookie(cookie.to_vec())));
        }

        IkePacket {
            header: Header {
                initiator_spi: self.initiator_spi,
                responder_spi: 0,
                message_id: 0,
            },
            exchange_type: ExchangeType::IkeSaInit,
            flags: IkeFlags::INITIATOR,
            payloads,
        }
    }
}

/// Result of a completed IKE_SA_INIT exchange.
#[derive(Debug, Clone)]
pub struct EstablishedSa {
    pub initiator_spi: u64,
    pub responder_spi: u64,
    pub prf: PrfAlgorithm,
    pub encryption: EncryptionAlgorithm,
    pub keys: KeyMaterial,
    pub nat: NatStatus,
    /// Cookie challenges answered before the responder committed state
    pub cookie_rounds: u8,
}

#[derive(Debug)]
pub enum HandshakeState {
    Idle,
    AwaitingResponse {
        session: Session,
        cookie_rounds: u8,
    },
    ReceivedCookieChallenge {
        session: Session,
        cookie: Vec<u8>,
        cookie_rounds: u8,
    },
    ReceivedSaInitResponse {
        session: Session,
        response: IkePacket,
        cookie_rounds: u8,
    },
    KeysDerived(EstablishedSa),
    Failed(Error),
}

impl HandshakeState {
    pub fn name(&self) -> &'static str {
        match self {
            HandshakeState::Idle => "Idle",
            HandshakeState::AwaitingResponse { .. } => "AwaitingResponse",
            HandshakeState::ReceivedCookieChallenge { .. } => "ReceivedCookieChallenge",
            HandshakeState::ReceivedSaInitResponse { .. } => "ReceivedSaInitResponse",
            HandshakeState::KeysDerived(_) => "KeysDerived",
            HandshakeState::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::KeysDerived(_) | HandshakeState::Failed(_)
        )
    }

    /// Initiator and responder SPIs known in this state, zero when unknown.
    fn spis(&self) -> (u64, u64) {
        match self {
            HandshakeState::Idle | HandshakeState::Failed(_) => (0, 0),
            HandshakeState::AwaitingResponse { session, .. }
            | HandshakeState::ReceivedCookieChallenge { session, .. } => {
                (session.initiator_spi, 0)
            }
            HandshakeState::ReceivedSaInitResponse { response, .. } => (
                response.header.initiator_spi,
                response.header.responder_spi,
            ),
            HandshakeState::KeysDerived(sa) => (sa.initiator_spi, sa.responder_spi),
        }
    }
}

/// Drives one IKE_SA_INIT exchange over `transport`.
pub struct Handshake<T: Transport, E: EntropySource> {
    config: HandshakeConfig,
    transport: T,
    entropy: E,
}

impl<T: Transport, E: EntropySource> Handshake<T, E> {
    pub fn new(config: HandshakeConfig, transport: T, entropy: E) -> Self {
        Self {
            config,
            transport,
            entropy,
        }
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run the exchange to completion.
    pub async fn run(&mut self) -> Result<EstablishedSa> {
        let mut state = HandshakeState::Idle;
        loop {
            state = match self.step(state).await {
                HandshakeState::KeysDerived(sa) => return Ok(sa),
                HandshakeState::Failed(err) => {
                    logging::log_handshake_failed(self.transport.peer_addr(), &err.to_string());
                    return Err(err);
                }
                next => next,
            };
        }
    }

    /// Advance by one transition. Terminal states are returned unchanged.
    pub async fn step(&mut self, state: HandshakeState) -> HandshakeState {
        let from = state.name();
        let (fallback_spi, _) = state.spis();

        let next = match state {
            HandshakeState::Idle => self.start().await,
            HandshakeState::AwaitingResponse {
                session,
                cookie_rounds,
            } => self.receive(session, cookie_rounds).await,
            HandshakeState::ReceivedCookieChallenge {
                session,
                cookie,
                cookie_rounds,
            } => self.answer_cookie(session, cookie, cookie_rounds).await,
            HandshakeState::ReceivedSaInitResponse {
                session,
                response,
                cookie_rounds,
            } => derive_keys(session, response, cookie_rounds),
            terminal @ (HandshakeState::KeysDerived(_) | HandshakeState::Failed(_)) => {
                return terminal
            }
        };
        let next = next.unwrap_or_else(HandshakeState::Failed);

        let (spi_i, spi_r) = match next.spis() {
            (0, _) => (fallback_spi, 0),
            spis => spis,
        };
        logging::log_state_transition(spi_i, spi_r, from, next.name());
        next
    }

    async fn start(&mut self) -> Result<HandshakeState> {
        self.config.validate()?;
        let local_addr = self.transport.local_addr()?;
        let peer_addr = self.transport.peer_addr();
        logging::log_handshake_start(peer_addr, local_addr);

        let session = Session::new(&self.config, &self.entropy, local_addr, peer_addr)?;
        self.send_request(&session, None).await?;
        Ok(HandshakeState::AwaitingResponse {
            session,
            cookie_rounds: 0,
        })
    }

    async fn send_request(&mut self, session: &Session, cookie: Option<&[u8]>) -> Result<()> {
        let packet = session.request(&self.config, cookie).encode()?;
        logging::log_packet_sent(session.initiator_spi, &packet);
        self.transport.send_packet(&packet).await
    }

    async fn receive(&mut self, session: Session, cookie_rounds: u8) -> Result<HandshakeState> {
        let received =
            tokio::time::timeout(self.config.receive_timeout, self.transport.receive_packet())
                .await;
        let packet = match received {
            Ok(packet) => packet?,
            Err(_) => {
                return Err(Error::new(ErrorKind::Timeout)
                    .context(|| format!("no response within {:?}", self.config.receive_timeout)))
            }
        };
        logging::log_packet_received(session.initiator_spi, &packet);

        let response = IkePacket::parse(&packet)?;
        check_response(&session, &response)?;

        if response.contains(PayloadType::CertificateRequest) {
            return Ok(HandshakeState::ReceivedSaInitResponse {
                session,
                response,
                cookie_rounds,
            });
        }
        if let Some(cookie) = response.notify_data(MessageType::Cookie) {
            return Ok(HandshakeState::ReceivedCookieChallenge {
                cookie: cookie.to_vec(),
                session,
                cookie_rounds,
            });
        }
        if let Some(message_type) = response.error_notify() {
            let code = u16::from(message_type);
            logging::log_peer_rejection(session.initiator_spi, code);
            return Err(Error::new(ErrorKind::Rejected(code)));
        }
        Err(Error::new(ErrorKind::UnexpectedResponse))
    }

    async fn answer_cookie(
        &mut self,
        session: Session,
        cookie: Vec<u8>,
        cookie_rounds: u8,
    ) -> Result<HandshakeState> {
        if cookie_rounds >= self.config.max_cookie_retries {
            logging::log_cookie_limit(session.initiator_spi, cookie_rounds);
            return Err(Error::new(ErrorKind::TooManyCookieChallenges(cookie_rounds)));
        }
        let round = cookie_rounds.saturating_add(1);
        logging::log_cookie_challenge(session.initiator_spi, round, cookie.len());

        self.send_request(&session, Some(&cookie)).await?;
        Ok(HandshakeState::AwaitingResponse {
            session,
            cookie_rounds: round,
        })
    }
}

/// Only an IKE_SA_INIT response to our own SPI belongs to this exchange.
fn check_response(session: &Session, response: &IkePacket) -> Result<()> {
    if response.exchange_type != ExchangeType::IkeSaInit
        || !response.flags.contains(IkeFlags::RESPONSE)
        || response.header.initiator_spi != session.initiator_spi
        || response.header.message_id != 0
    {
        return Err(Error::new(ErrorKind::UnexpectedResponse).context(|| {
            format!(
                "{:?} flags {:#04x} SPIi {:016x} message id {}",
                response.exchange_type,
                response.flags.bits(),
                response.header.initiator_spi,
                response.header.message_id
            )
        }));
    }
    Ok(())
}

fn derive_keys(session: Session, response: IkePacket, cookie_rounds: u8) -> Result<HandshakeState> {
    let key_exchange = response
        .key_exchange()
        .ok_or_else(|| Error::new(ErrorKind::MissingPayload("KE")))?;
    let nonce_r = response
        .nonce()
        .ok_or_else(|| Error::new(ErrorKind::MissingPayload("Nonce")))?;
    let prf = response
        .prf()
        .ok_or_else(|| Error::new(ErrorKind::NotNegotiated("PRF")))?;
    let encryption = response
        .encryption()
        .cloned()
        .ok_or_else(|| Error::new(ErrorKind::NotNegotiated("encryption algorithm")))?;
    let sizes = KeySizes::negotiated(&response)?;

    let shared_secret = session
        .key_pair
        .shared_secret(key_exchange.group, &key_exchange.public_value)?;
    let responder_spi = response.header.responder_spi;
    let keys = KeyMaterial::derive(
        prf,
        sizes,
        shared_secret.as_bytes(),
        &session.nonce,
        nonce_r,
        session.initiator_spi,
        responder_spi,
    )?;

    let nat = NatDetection::detected(&response, session.local_addr, session.peer_addr);
    logging::log_handshake_complete(session.initiator_spi, responder_spi, cookie_rounds);

    Ok(HandshakeState::KeysDerived(EstablishedSa {
        initiator_spi: session.initiator_spi,
        responder_spi,
        prf,
        encryption,
        keys,
        nat,
        cookie_rounds,
    }))
}
