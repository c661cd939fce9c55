/// Size of the fixed slot used to exchange host identities.
/// Matches `MPI_MAX_PROCESSOR_NAME` of Open MPI.
pub const MAX_PROCESSOR_NAME: usize = 256;

/// Process group APIs
///
/// Unless stated otherwise, every method is a collective call: all participants must invoke it,
/// in the same order and the same number of times, or the group deadlocks.
pub trait GroupEngine {
    const ROOT_RANK: i32 = 0;

    /// Get the number of participants in the group
    fn world_size(&self) -> usize;

    /// Get the rank of the current participant (local)
    fn world_rank(&self) -> usize;

    #[inline(always)]
    /// Check if the current participant is the root (local)
    fn is_root(&self) -> bool {
        self.world_rank() == Self::ROOT_RANK as usize
    }

    #[inline(always)]
    /// Check if there is only one participant in the group (local)
    fn is_single_process(&self) -> bool {
        self.world_size() == 1
    }

    /// Barrier for all the participants
    fn barrier(&self);

    /// Monotonic wall clock in seconds (local)
    fn wtime(&self) -> f64;

    /// Host/node identity of the current participant (local)
    fn processor_name(&self) -> String;

    /// Gather a byte vector from all the participants into the root.
    ///
    /// Every participant must supply the same number of bytes. On the root, `global_vec` is
    /// replaced by the rank-ordered concatenation; elsewhere it is left untouched.
    fn gather_vec(&self, local_vec: &[u8], global_vec: &mut Vec<u8>);

    /// Terminate every participant of the group. Never returns.
    fn abort(&self, error_code: i32) -> !;

    /// Gather the processor name of every participant into the root, in rank order.
    /// Returns an empty vector on non-root participants.
    fn gather_processor_names(&self) -> Vec<String> {
        let local = encode_processor_name(&self.processor_name());
        let mut global = vec![];
        self.gather_vec(&local, &mut global);
        if !self.is_root() {
            return vec![];
        }
        global
            .chunks(MAX_PROCESSOR_NAME)
            .map(decode_processor_name)
            .collect()
    }
}

/// Write `name` into a NUL-padded slot of `MAX_PROCESSOR_NAME` bytes.
/// At least one trailing NUL is kept; longer names are cut at a char boundary.
pub fn encode_processor_name(name: &str) -> Vec<u8> {
    let mut end = name.len().min(MAX_PROCESSOR_NAME - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }

    let mut slot = vec![0u8; MAX_PROCESSOR_NAME];
    slot[..end].copy_from_slice(&name.as_bytes()[..end]);
    slot
}

/// Read a name back from a NUL-padded slot.
pub fn decode_processor_name(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    String::from_utf8_lossy(&slot[..end]).into_owned()
}
