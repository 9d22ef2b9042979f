/**
 * Enumerated STUN/TURN registries: message classes, methods, attribute kinds
 * and error codes.
 */

/// Bits of the 14-bit type field that carry the class (C0 at bit 4, C1 at bit 8)
pub(crate) const CLASS_MASK: u16 = 0x0110;

/// Bits of the 14-bit type field that carry the method
pub(crate) const METHOD_MASK: u16 = 0x3EEF;

/**
 * Message class, stored pre-shifted into its type field position so it can be
 * merged with a method by a plain OR.
 */
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Request = 0x0000,
    Indication = 0x0010,
    Response = 0x0100,
    Error = 0x0110,
}

impl Class {
    /**
     * Extract the class from a raw type field. Every combination of the two
     * class bits is a valid class.
     */
    pub fn from_type(type_field: u16) -> Self {
        match type_field & CLASS_MASK {
            0x0000 => Class::Request,
            0x0010 => Class::Indication,
            0x0100 => Class::Response,
            _ => Class::Error,
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

/**
 * STUN/TURN methods (RFC 5389, RFC 5766, RFC 6062)
 */
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Binding = 0x001,
    Allocate = 0x003,
    Refresh = 0x004,
    Send = 0x006,
    Data = 0x007,
    CreatePermission = 0x008,
    ChannelBind = 0x009,
    Connect = 0x00A,
    ConnectionBind = 0x00B,
    ConnectionAttempt = 0x00C,
    GoogPing = 0x080,
}

impl Method {
    pub fn from_number(number: u16) -> Option<Self> {
        Some(match number {
            0x001 => Method::Binding,
            0x003 => Method::Allocate,
            0x004 => Method::Refresh,
            0x006 => Method::Send,
            0x007 => Method::Data,
            0x008 => Method::CreatePermission,
            0x009 => Method::ChannelBind,
            0x00A => Method::Connect,
            0x00B => Method::ConnectionBind,
            0x00C => Method::ConnectionAttempt,
            0x080 => Method::GoogPing,
            _ => return None,
        })
    }

    pub fn number(self) -> u16 {
        self as u16
    }

    /**
     * Spread the 12-bit method number around the class bits:
     * M0-M3 stay at bits 0-3, M4-M6 move to bits 5-7, M7-M11 move to bits 9-13.
     */
    pub fn to_type_bits(self) -> u16 {
        encode_method(self.number())
    }
}

pub(crate) fn encode_method(number: u16) -> u16 {
    (number & 0x000F) | ((number & 0x0070) << 1) | ((number & 0x0F80) << 2)
}

pub(crate) fn decode_method(type_field: u16) -> u16 {
    (type_field & 0x000F) | ((type_field & 0x00E0) >> 1) | ((type_field & 0x3E00) >> 2)
}

/**
 * Attribute kinds this codec understands. Anything outside this set is an
 * unknown attribute kind.
 */
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    MappedAddress = 0x0001,
    Username = 0x0006,
    MessageIntegrity = 0x0008,
    ErrorCode = 0x0009,
    UnknownAttributes = 0x000A,
    ChannelNumber = 0x000C,
    Lifetime = 0x000D,
    XorPeerAddress = 0x0012,
    Data = 0x0013,
    Realm = 0x0014,
    Nonce = 0x0015,
    XorRelayedAddress = 0x0016,
    RequestedAddressFamily = 0x0017,
    EvenPort = 0x0018,
    RequestedTransport = 0x0019,
    DontFragment = 0x001A,
    AccessToken = 0x001B,
    MessageIntegritySha256 = 0x001C,
    PasswordAlgorithm = 0x001D,
    Userhash = 0x001E,
    XorMappedAddress = 0x0020,
    ReservationToken = 0x0022,
    Priority = 0x0024,
    UseCandidate = 0x0025,
    Padding = 0x0026,
    ResponsePort = 0x0027,
    ConnectionId = 0x002A,
    AdditionalAddressFamily = 0x8000,
    AddressErrorCode = 0x8001,
    PasswordAlgorithms = 0x8002,
    AlternateDomain = 0x8003,
    Icmp = 0x8004,
    Software = 0x8022,
    AlternateServer = 0x8023,
    TransactionTransmitCounter = 0x8025,
    CacheTimeout = 0x8027,
    Fingerprint = 0x8028,
    IceControlled = 0x8029,
    IceControlling = 0x802A,
    ResponseOrigin = 0x802B,
    OtherAddress = 0x802C,
    EcnCheck = 0x802D,
    ThirdPartyAuthorization = 0x802E,
    MobilityTicket = 0x8030,
    CiscoStunFlowdata = 0xC000,
    EnfFlowDescription = 0xC001,
    EnfNetworkStatus = 0xC002,
    CiscoWebexFlowInfo = 0xC003,
    CitrixTransactionId = 0xC056,
    GoogNetworkInfo = 0xC057,
    GoogLastIceCheckReceived = 0xC058,
    GoogMiscInfo = 0xC059,
    GoogObsolete1 = 0xC05A,
    GoogConnectionId = 0xC05B,
    GoogDelta = 0xC05C,
    GoogDeltaAck = 0xC05D,
    GoogDeltaSyncReq = 0xC05E,
    GoogMessageIntegrity32 = 0xC060,
}

impl AttributeKind {
    pub fn from_code(code: u16) -> Option<Self> {
        use AttributeKind::*;
        Some(match code {
            0x0001 => MappedAddress,
            0x0006 => Username,
            0x0008 => MessageIntegrity,
            0x0009 => ErrorCode,
            0x000A => UnknownAttributes,
            0x000C => ChannelNumber,
            0x000D => Lifetime,
            0x0012 => XorPeerAddress,
            0x0013 => Data,
            0x0014 => Realm,
            0x0015 => Nonce,
            0x0016 => XorRelayedAddress,
            0x0017 => RequestedAddressFamily,
            0x0018 => EvenPort,
            0x0019 => RequestedTransport,
            0x001A => DontFragment,
            0x001B => AccessToken,
            0x001C => MessageIntegritySha256,
            0x001D => PasswordAlgorithm,
            0x001E => Userhash,
            0x0020 => XorMappedAddress,
            0x0022 => ReservationToken,
            0x0024 => Priority,
            0x0025 => UseCandidate,
            0x0026 => Padding,
            0x0027 => ResponsePort,
            0x002A => ConnectionId,
            0x8000 => AdditionalAddressFamily,
            0x8001 => AddressErrorCode,
            0x8002 => PasswordAlgorithms,
            0x8003 => AlternateDomain,
            0x8004 => Icmp,
            0x8022 => Software,
            0x8023 => AlternateServer,
            0x8025 => TransactionTransmitCounter,
            0x8027 => CacheTimeout,
            0x8028 => Fingerprint,
            0x8029 => IceControlled,
            0x802A => IceControlling,
            0x802B => ResponseOrigin,
            0x802C => OtherAddress,
            0x802D => EcnCheck,
            0x802E => ThirdPartyAuthorization,
            0x8030 => MobilityTicket,
            0xC000 => CiscoStunFlowdata,
            0xC001 => EnfFlowDescription,
            0xC002 => EnfNetworkStatus,
            0xC003 => CiscoWebexFlowInfo,
            0xC056 => CitrixTransactionId,
            0xC057 => GoogNetworkInfo,
            0xC058 => GoogLastIceCheckReceived,
            0xC059 => GoogMiscInfo,
            0xC05A => GoogObsolete1,
            0xC05B => GoogConnectionId,
            0xC05C => GoogDelta,
            0xC05D => GoogDeltaAck,
            0xC05E => GoogDeltaSyncReq,
            0xC060 => GoogMessageIntegrity32,
            _ => return None,
        })
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/**
 * STUN/TURN error codes (RFC 5389 §15.6, RFC 5766 §15, RFC 8489)
 */
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TryAlternate = 300,
    BadRequest = 400,
    Unauthenticated = 401,
    Forbidden = 403,
    MobilityForbidden = 405,
    UnknownAttribute = 420,
    AllocationMismatch = 437,
    StaleNonce = 438,
    AddressFamilyNotSupported = 440,
    WrongCredentials = 441,
    UnsupportedTransportProtocol = 442,
    PeerAddressFamilyMismatch = 443,
    ConnectionAlreadyExists = 446,
    ConnectionTimeoutOrFailure = 447,
    AllocationQuotaReached = 486,
    RoleConflict = 487,
    ServerError = 500,
    InsufficientCapacity = 508,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn reason(self) -> &'static str {
        match self {
            ErrorCode::TryAlternate => "Try Alternate",
            ErrorCode::BadRequest => "Bad Request",
            ErrorCode::Unauthenticated => "Unauthenticated",
            ErrorCode::Forbidden => "Forbidden",
            ErrorCode::MobilityForbidden => "Mobility Forbidden",
            ErrorCode::UnknownAttribute => "Unknown Attribute",
            ErrorCode::AllocationMismatch => "Allocation Mismatch",
            ErrorCode::StaleNonce => "Stale Nonce",
            ErrorCode::AddressFamilyNotSupported => "Address Family not Supported",
            ErrorCode::WrongCredentials => "Wrong Credentials",
            ErrorCode::UnsupportedTransportProtocol => "Unsupported Transport Protocol",
            ErrorCode::PeerAddressFamilyMismatch => "Peer Address Family Mismatch",
            ErrorCode::ConnectionAlreadyExists => "Connection Already Exists",
            ErrorCode::ConnectionTimeoutOrFailure => "Connection Timeout or Failure",
            ErrorCode::AllocationQuotaReached => "Allocation Quota Reached",
            ErrorCode::RoleConflict => "Role Conflict",
            ErrorCode::ServerError => "Server Error",
            ErrorCode::InsufficientCapacity => "Insufficient Capacity",
        }
    }
}
