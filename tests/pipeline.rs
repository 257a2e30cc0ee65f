use std::fs;
use std::path::Path;
use std::path::PathBuf;

use mirmap::command::viewer::list_figures;
use mirmap::command::{
    Collapse, CountMirna, ExtractUnmapped, MappingSummary, MismatchDistribution, ParseBowtie, Viewer,
};
use mirmap::fileformat::CountTable;

const MIRNA_FA: &str = ">mir-a some description\nTGAGGTAG\n>mir-b\nCCAATTGG\n";

//r6 carries the same mismatch as r3, but with a low quality base at the mismatch
const S1_FASTQ: &str = "@r1\nTGAGGTAGAA\n+\nIIIIIIIIII
@r2\nTGAGGTAGAA\n+\nIIIIIIIIII
@r3\nTGATGTAGAA\n+\nIIIIIIIIII
@r4\nGGGGGGGGGG\n+\nIIIIIIIIII
@r5\nCCAATTGGCCAATTGG\n+\nIIIIIIIIIIIIIIII
@r6\nTGATGTAGAA\n+\nIII#IIIIII
";

const S2_FASTQ: &str = "@q1\nTGAGGTAGAA\n+\nIIIIIIIIII\n";

//What bowtie writes when the miRNAs are aligned onto the collapsed reads of s1
const S1_BOWTIE: &str = "mir-a\t+\tTGAGGTAGAA#2\t0\tTGAGGTAG\tIIIIIIII\t0\t
mir-a\t+\tTGATGTAGAA#2\t0\tTGAGGTAG\tIIIIIIII\t0\t3:T>G
mir-b\t+\tCCAATTGGCCAATTGG#1\t8\tCCAATTGG\tIIIIIIII\t1\t
mir-b\t+\tCCAATTGGCCAATTGG#1\t0\tCCAATTGG\tIIIIIIII\t1\t
";

const S2_BOWTIE: &str = "mir-a\t+\tTGAGGTAGAA#1\t0\tTGAGGTAG\tIIIIIIII\t0\t\n";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_pipeline_without_bowtie() {
    let dir = tempfile::tempdir().unwrap();
    let dir_in = dir.path().join("in");
    let dir_out = dir.path().join("out");
    fs::create_dir_all(&dir_in).unwrap();
    fs::create_dir_all(&dir_out).unwrap();

    let path_mirna = write(&dir_in, "mirna.fa", MIRNA_FA);
    let s1 = write(&dir_in, "s1.fastq", S1_FASTQ);
    let s2 = write(&dir_in, "s2.fastq", S2_FASTQ);

    // Collapse
    let path_collapsed = dir_out.join("s1.col.fa");
    let stats = Collapse::run(&Collapse {
        path_in: s1.clone(),
        path_out: path_collapsed.clone(),
    })
    .unwrap();
    assert_eq!(stats.num_reads, 6);
    assert_eq!(stats.num_unique, 4);
    assert_eq!(
        fs::read_to_string(&path_collapsed).unwrap(),
        ">TGAGGTAGAA#2\nTGAGGTAGAA\n>TGATGTAGAA#2\nTGATGTAGAA\n>CCAATTGGCCAATTGG#1\nCCAATTGGCCAATTGG\n>GGGGGGGGGG#1\nGGGGGGGGGG\n"
    );

    // Parse
    let bowtie_s1 = write(&dir_out, "s1.bowtie_mapped.txt", S1_BOWTIE);
    let bowtie_s2 = write(&dir_out, "s2.bowtie_mapped.txt", S2_BOWTIE);
    let parsed_s1 = dir_out.join("s1.bowtie_mapped.parsed.txt");
    let parsed_s2 = dir_out.join("s2.bowtie_mapped.parsed.txt");

    let stats = ParseBowtie::run(&ParseBowtie {
        path_bowtie: bowtie_s1.clone(),
        path_fastq: s1.clone(),
        path_out: parsed_s1.clone(),
    })
    .unwrap();
    assert_eq!(stats.num_unique, 3);
    assert_eq!(stats.num_concatemer, 1);
    assert_eq!(stats.num_multimapped, 0);
    assert_eq!(stats.num_rows, 5);

    let text = fs::read_to_string(&parsed_s1).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("# miRNA_name"));
    assert_eq!(lines[1], "mir-b\tPM\tIIIIIIII\t\t\tCCAATTGG\tIIIIIIII");
    assert!(lines.contains(&"mir-a\t4:GT:40\tIII IIII\t\t\tAA\tII"));
    assert!(lines.contains(&"mir-a\t4:GT:2\tIII IIII\t\t\tAA\tII"));

    ParseBowtie::run(&ParseBowtie {
        path_bowtie: bowtie_s2,
        path_fastq: s2.clone(),
        path_out: parsed_s2.clone(),
    })
    .unwrap();

    // Unmapped
    let unmapped = ExtractUnmapped::run(&ExtractUnmapped {
        path_fastq: s1.clone(),
        path_bowtie: bowtie_s1,
        path_out: dir_out.join("s1.bowtie_unmapped.fastq"),
    })
    .unwrap();
    assert_eq!(unmapped.num_mapped, 5);
    assert_eq!(unmapped.num_unmapped, 1);
    assert_eq!(
        fs::read_to_string(dir_out.join("s1.bowtie_unmapped.fastq")).unwrap(),
        "@r4\nGGGGGGGGGG\n+\nIIIIIIIIII\n"
    );

    // Count
    let path_counts = dir_out.join("miRNA_count.Q38.txt");
    let table = CountMirna::run(&CountMirna {
        path_in: vec![parsed_s1, parsed_s2],
        path_out: path_counts.clone(),
        min_quality: 38,
    })
    .unwrap();
    assert_eq!(table.samples, vec!["s1", "s2"]);
    assert_eq!(
        fs::read_to_string(&path_counts).unwrap(),
        "miRNA name\tpos:mut\ts1\ts2\ts1 (PM+1MM+2MM)\ts2 (PM+1MM+2MM)
mir-a\tPM\t2\t1\t3\t1
mir-a\t4:GT\t1\t0\t3\t1
mir-b\tPM\t1\t0\t1\t0
"
    );
    assert_eq!(CountTable::read_tsv(&path_counts).unwrap(), table);

    // Summary
    let path_summary = dir_out.join("Mapping_summary.Q38.txt");
    MappingSummary::run(
        &MappingSummary {
            path_fastq: vec![s1, s2],
            path_out: path_summary.clone(),
        },
        &table,
    )
    .unwrap();
    let text = fs::read_to_string(&path_summary).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "s1\t6\t3\t50.00\t1\t16.67\t0\t0.00");
    assert_eq!(lines[2], "s2\t1\t1\t100.00\t0\t0.00\t0\t0.00");

    // Mismatch distribution
    let dir_figures = dir_out.join("figures");
    let distribution = MismatchDistribution::run(&MismatchDistribution {
        path_reference: path_mirna,
        path_counts,
        mirna: "mir-a".to_string(),
        sample: Some("s1".to_string()),
        path_out: dir_figures.clone(),
    })
    .unwrap();
    assert_eq!(distribution.total_reads, 3);
    assert_eq!(distribution.rows.len(), 1);
    assert_eq!(distribution.rows[0].position, 4);
    assert_eq!(distribution.rows[0].canonical_base, 'G');
    assert_eq!(distribution.rows[0].observed_base, 'T');
    assert_eq!(distribution.rows[0].count, 1);
    assert!(dir_figures.join("mir-a_mismatch_distribution.tsv").exists());

    // Viewer
    let figures = list_figures(&dir_figures).unwrap();
    assert_eq!(figures.len(), 1);
    assert_eq!(figures[0].title, "mir-a_mismatch_distribution");

    let path_html = dir_out.join("viewer.html");
    let num_included = Viewer::run(&Viewer {
        path_figures: dir_figures,
        figures,
        title: "Mismatches".to_string(),
        stats: vec![("Samples".to_string(), "2".to_string())],
        path_out: path_html.clone(),
    })
    .unwrap();
    assert_eq!(num_included, 1);
    let html = fs::read_to_string(&path_html).unwrap();
    assert!(html.contains("mir-a_mismatch_distribution.svg"));
}
