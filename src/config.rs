/// Configuration of the transmit pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxConfig {
    /// Admission control mandatory bitmap advertised by the AP.
    ///
    /// Bit `n` corresponds to the access category with index `n`.
    pub acm_bitmap: u8,
    /// The maximum number of scatter-gather segments the hardware accepts per frame.
    pub max_segments: usize,
    /// After this many software retries, a frame is dropped.
    pub max_sw_retry: u8,
    /// The credits every TXQ starts out with.
    pub nominal_credits: u8,
    /// A TXQ refuses new frames, once it holds `backlog_factor * nominal_credits` frames.
    pub backlog_factor: usize,
    /// The number of descriptors, that can be outstanding at the same time.
    pub descriptor_pool: usize,
    /// The number of virtual interfaces.
    pub vif_count: usize,
    /// The number of station indices.
    pub sta_count: usize,
}
impl TxConfig {
    pub const fn with_acm_bitmap(mut self, acm_bitmap: u8) -> Self {
        self.acm_bitmap = acm_bitmap;
        self
    }
    pub const fn with_max_segments(mut self, max_segments: usize) -> Self {
        self.max_segments = max_segments;
        self
    }
    pub const fn with_max_sw_retry(mut self, max_sw_retry: u8) -> Self {
        self.max_sw_retry = max_sw_retry;
        self
    }
    pub const fn with_nominal_credits(mut self, nominal_credits: u8) -> Self {
        self.nominal_credits = nominal_credits;
        self
    }
    pub const fn with_backlog_factor(mut self, backlog_factor: usize) -> Self {
        self.backlog_factor = backlog_factor;
        self
    }
    pub const fn with_descriptor_pool(mut self, descriptor_pool: usize) -> Self {
        self.descriptor_pool = descriptor_pool;
        self
    }
    pub const fn with_vif_count(mut self, vif_count: usize) -> Self {
        self.vif_count = vif_count;
        self
    }
    pub const fn with_sta_count(mut self, sta_count: usize) -> Self {
        self.sta_count = sta_count;
        self
    }
    /// The maximum number of frames a TXQ holds.
    pub const fn backlog_limit(&self) -> usize {
        self.backlog_factor * self.nominal_credits as usize
    }
}
impl Default for TxConfig {
    fn default() -> Self {
        Self {
            acm_bitmap: 0,
            max_segments: 4,
            max_sw_retry: 3,
            nominal_credits: 4,
            backlog_factor: 3,
            descriptor_pool: 64,
            vif_count: 4,
            sta_count: 16,
        }
    }
}
