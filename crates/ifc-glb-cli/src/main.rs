// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! main() for the `ifc2glb` converter.

use std::process::ExitCode;

use clap::Parser as _;
use ifc_glb_cli::{install_logging, run, Args};

fn main() -> Result<ExitCode, anyhow::Error> {
    let args = Args::parse();
    install_logging(args.verbose)?;

    let report = run(&args, &mut std::io::stdout().lock())?;
    if report.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
