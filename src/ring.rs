use crate::descriptor::TxDescriptor;

/// Why the hardware didn't take a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    /// There is no room in the ring right now. The frame can be submitted again later.
    RingFull,
    /// The hardware is in a state, where it can't transmit this frame.
    Hardware,
}

/// The transmit ring of the firmware or hardware.
///
/// The ring only borrows the descriptor. Once [TxRing::push] returns `Ok(())`, the descriptor is
/// in flight and the pipeline keeps it, until the confirmation with its host ID arrives.
pub trait TxRing {
    /// Hand a descriptor to the hardware.
    fn push(&mut self, descriptor: &TxDescriptor) -> Result<(), SubmitError>;
}
impl<R: TxRing + ?Sized> TxRing for &mut R {
    fn push(&mut self, descriptor: &TxDescriptor) -> Result<(), SubmitError> {
        (**self).push(descriptor)
    }
}
