use bitflags::bitflags;

bitflags! {
    /// Options controlling a single verification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VerifyFlags: u32 {
        /// Check revocation for every certificate in the chain
        const ENABLE_REV_CHECKING = 1 << 0;
        /// Check revocation only when the chain qualifies for EV
        const REV_CHECKING_ENABLED_EV_ONLY = 1 << 1;
        /// Accept chains signed with weak algorithms
        const ALLOW_WEAK_SIGNATURE = 1 << 2;
        /// Require revocation checks for chains ending at an additional anchor
        const REQUIRE_REV_CHECKING_LOCAL_ANCHORS = 1 << 3;
        /// Accept SHA-1 signatures for chains ending at an additional anchor
        const ENABLE_SHA1_LOCAL_ANCHORS = 1 << 4;
    }
}
