//! The 11 known bank-statement layouts. Each adapter is a
//! thin column-layout declaration over the shared row-walking helpers in
//! [`common`]; adding a twelfth bank means adding one file here plus one
//! registry entry, never touching merge or dispatch logic.

pub mod common;

mod bca;
mod bni;
mod bri;
mod btn;
mod cimb_niaga;
mod danamon;
mod mandiri;
mod maybank;
mod ocbc_nisp;
mod panin;
mod permata;

use std::sync::Arc;

use crate::bank::adapter::BankAdapter;

use bca::BcaAdapter;
use bni::BniAdapter;
use bri::BriAdapter;
use btn::BtnAdapter;
use cimb_niaga::CimbNiagaAdapter;
use danamon::DanamonAdapter;
use mandiri::MandiriAdapter;
use maybank::MaybankAdapter;
use ocbc_nisp::OcbcNispAdapter;
use panin::PaninAdapter;
use permata::PermataAdapter;

pub fn builtin_adapters() -> Vec<Arc<dyn BankAdapter>> {
    vec![
        Arc::new(BcaAdapter),
        Arc::new(MandiriAdapter),
        Arc::new(BniAdapter),
        Arc::new(BriAdapter),
        Arc::new(CimbNiagaAdapter),
        Arc::new(PermataAdapter),
        Arc::new(DanamonAdapter),
        Arc::new(OcbcNispAdapter),
        Arc::new(MaybankAdapter),
        Arc::new(BtnAdapter),
        Arc::new(PaninAdapter),
    ]
}
