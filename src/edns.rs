//! Constants and small accessors for the EDNS(0) OPT pseudo-RR.
//!
//! The query processor and wire codec that actually parse and build OPT
//! records are external collaborators; this module only carries the
//! constants and field accessors an integration needs, mirroring what a
//! real OPT RR library exposes.

/// The smallest UDP payload size a client advertising EDNS must accept.
pub const MIN_UDP_PAYLOAD: u16 = 512;

/// The smallest UDP payload size usable when DNSSEC records are involved.
pub const MIN_DNSSEC_PAYLOAD: u16 = 1220;

/// A conservative default maximum UDP payload size.
pub const MAX_UDP_PAYLOAD: u16 = 4096;

/// The only EDNS version this crate understands.
pub const VERSION: u8 = 0;

/// The NSID (Name Server Identifier) option code.
pub const OPTION_NSID: u16 = 3;

/// The minimum wire size of an OPT RR (owner, type, class, TTL, RDLENGTH).
pub const MIN_SIZE: usize = 11;

/// The size of an option's header (code + length) within OPT RDATA.
pub const OPTION_HDRLEN: usize = 4;

/// The `DO` (DNSSEC OK) bit within the OPT RR's extended flags.
pub const FLAG_DO: u16 = 1 << 15;

/// Extended RCODE returned when the requested EDNS version is unsupported.
pub const RCODE_BADVERS: u8 = 16;

/// A single EDNS option carried in an OPT RR's RDATA.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Option {
    pub code: u16,
    pub data: Vec<u8>,
}

/// The fields of an EDNS(0) OPT pseudo-RR, decoupled from wire encoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Opt {
    pub max_udp_payload: u16,
    pub ext_rcode: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<Option>,
}

impl Opt {
    pub fn dnssec_ok(&self) -> bool {
        self.flags & FLAG_DO != 0
    }

    pub fn set_dnssec_ok(&mut self, on: bool) {
        if on {
            self.flags |= FLAG_DO;
        } else {
            self.flags &= !FLAG_DO;
        }
    }

    pub fn nsid(&self) -> std::option::Option<&[u8]> {
        self.options
            .iter()
            .find(|o| o.code == OPTION_NSID)
            .map(|o| o.data.as_slice())
    }
}
