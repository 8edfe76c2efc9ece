use std::io::Read;

use li820_frame::locate_frame;
use li820_sampler::decode;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_measurements, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = match &args.file {
        Some(path) => std::fs::read(path)
            .map_err(|err| io_error(&format!("read {} failed", path.display()), err))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("read stdin failed", err))?;
            buf
        }
    };

    // Captures usually carry line noise around the frame; decode the most
    // recent complete frame when there is one.
    let config = args.session.session_config();
    let frame = match locate_frame(&input, &config.frame_tag.markers()) {
        Some(range) => &input[range],
        None => input.as_slice(),
    };
    let frame = String::from_utf8_lossy(frame);

    let record = decode(frame.trim(), &config);
    print_measurements(std::slice::from_ref(&record), format);

    if record.is_sentinel() {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
