//! Temporal identifiers
//!
//! A [`TemporalId`] is 16 bytes, big-endian throughout:
//!
//! ```text
//! bytes  0..6    milliseconds since the Unix epoch (48 bits)
//! bytes  6..12   node identity, usually a MAC address (48 bits)
//! bytes 12..16   instance tag (high 4 bits) | sequence (low 28 bits)
//! ```
//!
//! Ids minted by one [`TemporalIdGenerator`] compare (as bytes, or as their
//! lowercase hex strings) in creation order. That single property lets the
//! id serve as primary key, sort key and pagination cursor at once.
//!
//! ## Sequence wrap
//!
//! The sequence resets every millisecond. A generator that mints more than
//! 2^28 ids inside one millisecond wraps the sequence back to 0 and will
//! repeat ids. Nothing guards against this.
//!
//! ## Clock steps
//!
//! If the wall clock moves backwards the generator simply records the
//! earlier millisecond, so ids minted after the step sort before ids minted
//! just before it.

use byteorder::{BigEndian, ByteOrder};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use uuid::Uuid;

use crate::error::IdError;

/// Width of the per-millisecond sequence field
pub const SEQUENCE_BITS: u32 = 28;

/// Mask selecting the sequence field of the trailing 32-bit word
pub const SEQUENCE_MASK: u32 = (1 << SEQUENCE_BITS) - 1;

/// Largest instance tag (4 bits)
pub const MAX_INSTANCE_TAG: u8 = 0x0F;

const MILLIS_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Time-ordered 16-byte identifier
///
/// Displays and serializes as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemporalId([u8; 16]);

impl TemporalId {
    /// Assemble an id from its fields.
    ///
    /// `millis` is truncated to 48 bits, `instance` to 4 bits and
    /// `sequence` to 28 bits.
    pub fn from_parts(millis: u64, node: NodeId, instance: u8, sequence: u32) -> Self {
        let mut bytes = [0u8; 16];
        BigEndian::write_u48(&mut bytes[0..6], millis & MILLIS_MASK);
        bytes[6..12].copy_from_slice(node.as_bytes());
        let tail = (u32::from(instance & MAX_INSTANCE_TAG) << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK);
        BigEndian::write_u32(&mut bytes[12..16], tail);
        TemporalId(bytes)
    }

    /// Create an id from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        TemporalId(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Generation time in milliseconds since the epoch
    pub fn millis(&self) -> u64 {
        BigEndian::read_u48(&self.0[0..6])
    }

    /// Node identity embedded at generation
    pub fn node(&self) -> NodeId {
        let mut node = [0u8; 6];
        node.copy_from_slice(&self.0[6..12]);
        NodeId(node)
    }

    /// Instance tag
    pub fn instance(&self) -> u8 {
        self.0[12] >> 4
    }

    /// Sequence number within the generation millisecond
    pub fn sequence(&self) -> u32 {
        BigEndian::read_u32(&self.0[12..16]) & SEQUENCE_MASK
    }
}

impl fmt::Display for TemporalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_bytes(self.0).simple())
    }
}

impl FromStr for TemporalId {
    type Err = IdError;

    /// Parse exactly 32 hex characters, either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdError::InvalidId(s.to_string()));
        }
        Uuid::try_parse(s)
            .map(|u| TemporalId(*u.as_bytes()))
            .map_err(|_| IdError::InvalidId(s.to_string()))
    }
}

impl Serialize for TemporalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TemporalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 48-bit node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId([u8; 6]);

impl NodeId {
    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        NodeId(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check if every byte is zero (loopback interfaces report this)
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 6]
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unavailable = |reason: &str| IdError::NodeIdentityUnavailable {
            source_name: s.to_string(),
            reason: reason.to_string(),
        };
        let digits: String = s.trim().chars().filter(|c| *c != ':' && *c != '-').collect();
        if digits.len() != 12 {
            return Err(unavailable("expected 12 hex digits"));
        }
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| unavailable("not a hex address"))?;
        }
        Ok(NodeId(bytes))
    }
}

/// Where a generator takes its node identity from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIdentity {
    /// Hardware address of a network interface, e.g. `eth0`
    Interface(String),
    /// Explicit identity
    Fixed(NodeId),
}

impl NodeIdentity {
    /// Resolve to a concrete node id.
    ///
    /// Interface lookup reads `/sys/class/net/<name>/address`, so it only
    /// succeeds on Linux.
    pub fn resolve(&self) -> Result<NodeId, IdError> {
        match self {
            NodeIdentity::Fixed(node) => Ok(*node),
            NodeIdentity::Interface(name) => {
                let path = format!("/sys/class/net/{}/address", name);
                let address = std::fs::read_to_string(&path).map_err(|e| {
                    IdError::NodeIdentityUnavailable {
                        source_name: name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let node: NodeId = address.parse().map_err(|_| IdError::NodeIdentityUnavailable {
                    source_name: name.clone(),
                    reason: format!("unreadable hardware address '{}'", address.trim()),
                })?;
                if node.is_nil() {
                    warn!(interface = %name, "network interface reports an all-zero hardware address");
                }
                Ok(node)
            }
        }
    }
}

/// Millisecond wall clock
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct SequenceState {
    last_millis: Option<u64>,
    sequence: u32,
}

/// Mints [`TemporalId`]s for one node identity and instance tag
///
/// Create one per process and share it (it is `Send + Sync`); the internal
/// lock is held only while the millisecond and sequence are assigned.
pub struct TemporalIdGenerator {
    node: NodeId,
    instance: u8,
    clock: Arc<dyn Clock>,
    state: Mutex<SequenceState>,
}

impl TemporalIdGenerator {
    /// Create a generator on the system clock.
    ///
    /// # Errors
    ///
    /// - `NodeIdentityUnavailable` if `identity` cannot be resolved
    /// - `InvalidInstanceTag` if `instance` exceeds 15
    pub fn new(identity: &NodeIdentity, instance: u8) -> Result<Self, IdError> {
        let node = identity.resolve()?;
        Self::with_clock(node, instance, Arc::new(SystemClock))
    }

    /// Create a generator with an explicit node id and clock.
    pub fn with_clock(node: NodeId, instance: u8, clock: Arc<dyn Clock>) -> Result<Self, IdError> {
        if instance > MAX_INSTANCE_TAG {
            return Err(IdError::InvalidInstanceTag(instance));
        }
        Ok(Self {
            node,
            instance,
            clock,
            state: Mutex::new(SequenceState::default()),
        })
    }

    /// Node identity embedded in every id
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Instance tag embedded in every id
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// Mint the next id.
    pub fn next_id(&self) -> TemporalId {
        let (millis, sequence) = {
            let mut state = self.state.lock();
            // Read the clock under the lock so lock order and time order agree.
            let now = self.clock.now_millis();
            if state.last_millis == Some(now) {
                state.sequence = state.sequence.wrapping_add(1) & SEQUENCE_MASK;
            } else {
                state.last_millis = Some(now);
                state.sequence = 0;
            }
            (now, state.sequence)
        };
        TemporalId::from_parts(millis, self.node, self.instance, sequence)
    }
}

impl fmt::Debug for TemporalIdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporalIdGenerator")
            .field("node", &self.node)
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}
