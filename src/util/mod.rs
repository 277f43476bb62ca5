mod pii;
pub(crate) use pii::Pii;

pub(crate) struct NonCryptographicRng;

impl NonCryptographicRng {
    #[inline(always)]
    pub fn u32() -> u32 {
        fastrand::u32(..)
    }
}
