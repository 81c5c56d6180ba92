pub(crate) trait BitsExt {
    fn set_mask(self, mask: Self) -> Self;
    fn clear_mask(self, mask: Self) -> Self;
    fn check_mask(self, mask: Self) -> bool;
}

impl BitsExt for u16 {
    #[inline(always)]
    fn set_mask(self, mask: Self) -> Self {
        self | mask
    }

    #[inline(always)]
    fn clear_mask(self, mask: Self) -> Self {
        self & !mask
    }

    #[inline(always)]
    fn check_mask(self, mask: Self) -> bool {
        self & mask != 0
    }
}
