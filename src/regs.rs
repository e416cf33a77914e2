//! Register offsets and field masks used by the sampler

/// Ring buffer register layout, relative to the ring's MMIO base
pub mod ring {
    /// Tail pointer register
    pub const TAIL: u32 = 0x00;
    /// Head pointer register
    pub const HEAD: u32 = 0x04;
    /// Start address register
    pub const START: u32 = 0x08;
    /// Control register, holds the ring length
    pub const CTL: u32 = 0x0c;

    /// Pointer field of the head register
    pub const HEAD_ADDR: u32 = 0x001f_fffc;
    /// Pointer field of the tail register
    pub const TAIL_ADDR: u32 = 0x001f_fff8;
    /// Page count field of the control register (pages - 1)
    pub const NR_PAGES: u32 = 0x001f_f000;
    /// Bits to shift the page count field down by
    pub const NR_PAGES_SHIFT: u32 = 12;
    /// Ring page size in bytes
    pub const PAGE_SIZE: u32 = 4096;

    /// Render command streamer
    pub const RENDER_BASE: u32 = 0x2030;
    /// Gen4/Gen5 bitstream decoder
    pub const BSD_BASE: u32 = 0x4030;
    /// Gen6 to gen10 video command streamer
    pub const GEN6_BSD_BASE: u32 = 0x12030;
    /// Gen6+ blitter command streamer
    pub const BLT_BASE: u32 = 0x22030;
}

/// Pipeline statistics counters, each a 64-bit low/high register pair
pub mod stats {
    /// Vertices fetched by the input assembler
    pub const IA_VERTICES_COUNT_QW: u32 = 0x2310;
    /// Primitives fetched by the input assembler
    pub const IA_PRIMITIVES_COUNT_QW: u32 = 0x2318;
    /// Vertex shader invocations
    pub const VS_INVOCATION_COUNT_QW: u32 = 0x2320;
    /// Geometry shader invocations
    pub const GS_INVOCATION_COUNT_QW: u32 = 0x2328;
    /// Primitives emitted by the geometry shader
    pub const GS_PRIMITIVES_COUNT_QW: u32 = 0x2330;
    /// Clipper invocations
    pub const CL_INVOCATION_COUNT_QW: u32 = 0x2338;
    /// Primitives emitted by the clipper
    pub const CL_PRIMITIVES_COUNT_QW: u32 = 0x2340;
    /// Pixel shader invocations
    pub const PS_INVOCATION_COUNT_QW: u32 = 0x2348;
    /// Pixels passing the depth test
    pub const PS_DEPTH_COUNT_QW: u32 = 0x2350;
}

/// Gen6+ GT forcewake request register
pub const FORCEWAKE: u32 = 0xa18c;
/// Gen6+ GT forcewake acknowledge register
pub const FORCEWAKE_ACK: u32 = 0x13_0090;
