/// Capability shared by the bruteforce modes (wordlist, raw): a finite,
/// restartable candidate sequence with a known size.
pub trait PasswordSource {
    /// Total number of candidates; used primarily to show progress status.
    fn count(&self) -> u64;

    /// A fresh pass over the candidate sequence. Multiple passes yield
    /// identical sequences.
    fn passwords(&self) -> Box<dyn Iterator<Item = String> + Send + '_>;
}
