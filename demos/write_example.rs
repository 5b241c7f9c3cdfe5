use std::fs::File;

use pegboard_io::structs::*;
use pegboard_io::io::{ExportOption, WritePegboard};

fn main() {
    env_logger::init();

    let mut board = PegboardData::new("hello_world");
    let mut root = TransformData::new("Pegs");

    let hello_world = [
        "#  #      # #          #     #           #    #",
        "#  #  ##  # #  ##      #     #  ##  # ## #  ###",
        "#### #### # # #  #     #  #  # #  # ##   # #  #",
        "#  # #    # # #  #      # # #  #  # #    # #  #",
        "#  #  ### # #  ##        # #    ##  #    #  ## ",
    ];

    let peg = Prefab::PegRegular(PegSettings {
        color: Color::new(0.2, 0.6, 1.0, 1.0),
        ..Default::default()
    });

    for (y, line) in hello_world.iter().enumerate() {
        for (x, c) in line.bytes().enumerate() {
            if c == b'#' {
                let name = format!("peg_{x}_{y}");
                root.child.push(
                    TransformData::new(name)
                        .at(x as f32 * 0.5, -(y as f32) * 0.5)
                        .with_prefab(peg.clone()),
                );
            }
        }
    }

    board.transforms.push(root);

    let option = ExportOption::DatWithHeader;
    let mut file = File::create(board.default_file_name(option)).unwrap();
    file.write_pegboard(&board, option).unwrap();
}
