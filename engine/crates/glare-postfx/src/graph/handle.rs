slotmap::new_key_type! {
    /// registry 中 image 的轻量句柄，pass 之间以此传递 image
    pub struct FxImageHandle;
}
