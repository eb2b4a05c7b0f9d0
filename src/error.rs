pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by every fallible operation in the workspace.
///
/// Equality only considers the [`ErrorKind`], so callers can match on the
/// kind whether or not the `verbose` feature recorded extra context.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    #[cfg(feature = "verbose")]
    context: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            #[cfg(feature = "verbose")]
            context: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// Attach a description of the offending input.
    ///
    /// The closure only runs when the `verbose` feature is enabled.
    #[cfg(feature = "verbose")]
    pub fn context<F>(mut self, describe: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context = Some(describe());
        self
    }

    #[cfg(not(feature = "verbose"))]
    pub fn context<F>(self, _describe: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self
    }

    /// Replace a raw bounds error with a kind describing where it happened.
    ///
    /// Any other kind is passed through untouched.
    pub fn recast(self, kind: ErrorKind) -> Self {
        if self.kind == ErrorKind::OutOfBounds {
            let mut this = self;
            this.kind = kind;
            this
        } else {
            self
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    // Bounds
    #[error("not enough bytes remaining for the requested read")]
    OutOfBounds,
    #[error("IKE header is truncated")]
    HeaderTooShort,
    #[error("IKE payload is truncated")]
    PayloadTooShort,

    // Consistency
    #[error("declared length does not match the bytes consumed")]
    InvalidConversion,
    #[error("transform length does not match its content")]
    InvalidTransformLength,
    #[error("proposal numbers are not sequential")]
    InvalidProposalNumber,
    #[error("invalid or unterminated next payload chain")]
    InvalidNextPayload,
    #[error("invalid next transform indicator")]
    InvalidNextTransform,
    #[error("invalid next proposal indicator")]
    InvalidNextProposal,
    #[error("declared packet length is shorter than the datagram")]
    InvalidPacketLength,
    #[error("content does not fit in its length field")]
    LengthOverflow,

    // Domain
    #[error("unsupported exchange type")]
    InvalidExchangeType,
    #[error("unsupported Diffie-Hellman group")]
    InvalidDiffieHellmanGroup,
    #[error("unsupported notify message type")]
    InvalidMessageType,
    #[error("unsupported certificate encoding")]
    InvalidCertificateType,
    #[error("unsupported transform type")]
    InvalidTransformType,
    #[error("unsupported transform id")]
    InvalidTransformId,
    #[error("unsupported or malformed transform attribute")]
    InvalidTransformAttribute,
    #[error("unsupported proposal protocol id")]
    InvalidProposalID,

    // Policy
    #[error("unsupported IKE version")]
    InvalidIKEVersion,
    #[error("payload has the critical bit set")]
    UnexpectedCriticalBit,

    // Resources
    #[error("secure random source unavailable")]
    Entropy,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("timed out waiting for a response")]
    Timeout,

    // Negotiation and handshake
    #[error("{0} was not negotiated")]
    NotNegotiated(&'static str),
    #[error("response is missing the {0} payload")]
    MissingPayload(&'static str),
    #[error("peer public value is out of range")]
    InvalidPublicValue,
    #[error("requested keystream is longer than prf+ can produce")]
    KeystreamTooLong,
    #[error("key length rejected by the PRF")]
    InvalidKeyLength,
    #[error("gave up after {0} cookie challenges")]
    TooManyCookieChallenges(u8),
    #[error("response carries neither keying material nor a cookie")]
    UnexpectedResponse,
    #[error("peer rejected the request with notify type {0}")]
    Rejected(u16),
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl std::fmt::Display for Error {
    #[cfg(feature = "verbose")]
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        match &self.context {
            Some(context) => write!(fmt, "{}: {}", self.kind, context),
            None => write!(fmt, "{}", self.kind),
        }
    }

    #[cfg(not(feature = "verbose"))]
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(other: std::io::Error) -> Self {
        Self::new(ErrorKind::Transport(other.to_string()))
    }
}

impl<I> From<nom::Err<nom::error::Error<I>>> for Error {
    fn from(_: nom::Err<nom::error::Error<I>>) -> Self {
        Self::new(ErrorKind::OutOfBounds)
    }
}
